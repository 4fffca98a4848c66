//! Canonical surface form used as a dedup key.
//!
//! Keys are never displayed; they only decide whether two tokens count as
//! "the same word" anywhere in a tree.

/// Lowercase and strip a naive plural suffix ("es" before "s").
pub fn normalize(word: &str) -> String {
    let mut w = word.to_lowercase();
    if w.ends_with("es") {
        w.truncate(w.len() - 2);
    } else if w.ends_with('s') {
        w.truncate(w.len() - 1);
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize("Brain"), "brain");
        assert_eq!(normalize("NASA"), "nasa");
    }

    #[test]
    fn test_normalize_strips_es_before_s() {
        assert_eq!(normalize("boxes"), "box");
        // "es" wins even when only the "s" is the real plural
        assert_eq!(normalize("Neurones"), "neuron");
        assert_eq!(normalize("cortexes"), "cortex");
    }

    #[test]
    fn test_normalize_strips_single_s() {
        assert_eq!(normalize("neurons"), "neuron");
        assert_eq!(normalize("s"), "");
    }

    #[test]
    fn test_normalize_leaves_singulars() {
        assert_eq!(normalize("mind"), "mind");
        assert_eq!(normalize(""), "");
    }
}
