//! Output formats for a finished tree: console, Markdown and JSON.

use crate::error::Result;
use crate::tree::TreeNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Box-drawing lines, one per node. Non-root nodes show their similarity.
pub fn console_lines(tree: &TreeNode) -> Vec<String> {
    let mut lines = Vec::new();
    push_console(tree, "", true, &mut lines);
    lines
}

fn push_console(node: &TreeNode, prefix: &str, is_last: bool, out: &mut Vec<String>) {
    let connector = if is_last { "└── " } else { "├── " };
    let sim = node
        .similarity_to_parent
        .map(|s| format!(" ({:.3})", s))
        .unwrap_or_default();
    out.push(format!("{}{}{}{}", prefix, connector, node.token, sim));

    let next_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        push_console(child, &next_prefix, i + 1 == count, out);
    }
}

pub fn print_tree(tree: &TreeNode) {
    for line in console_lines(tree) {
        println!("{}", line);
    }
}

/// Nested Markdown list, two spaces of indent per level.
pub fn to_markdown(tree: &TreeNode) -> Vec<String> {
    let mut lines = Vec::new();
    push_markdown(tree, 0, &mut lines);
    lines
}

fn push_markdown(node: &TreeNode, depth: usize, out: &mut Vec<String>) {
    let sim = node
        .similarity_to_parent
        .map(|s| format!(" *(sim: {:.3})*", s))
        .unwrap_or_default();
    out.push(format!("{}- **{}**{}", "  ".repeat(depth), node.token, sim));
    for child in &node.children {
        push_markdown(child, depth + 1, out);
    }
}

/// One `# root` section per tree.
pub fn markdown_document(trees: &BTreeMap<String, TreeNode>) -> String {
    let mut lines = Vec::new();
    for (root, tree) in trees {
        lines.push(format!("# {}", root));
        lines.extend(to_markdown(tree));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Combined JSON document: a map of root word to its full tree.
pub fn to_json(trees: &BTreeMap<String, TreeNode>) -> Result<String> {
    Ok(serde_json::to_string_pretty(trees)?)
}

/// Shape read by the browser front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleNode {
    #[serde(rename = "Id")]
    pub id: usize,
    pub word: String,
    pub children: Vec<SimpleNode>,
}

impl SimpleNode {
    /// Ids are assigned in pre-order starting at 1.
    pub fn from_tree(tree: &TreeNode) -> Self {
        let mut next_id = 1;
        Self::convert(tree, &mut next_id)
    }

    fn convert(node: &TreeNode, next_id: &mut usize) -> Self {
        let id = *next_id;
        *next_id += 1;
        Self {
            id,
            word: node.token.clone(),
            children: node
                .children
                .iter()
                .map(|c| Self::convert(c, next_id))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode {
            token: "brain".to_string(),
            similarity_to_parent: None,
            children: vec![
                TreeNode {
                    token: "cortex".to_string(),
                    similarity_to_parent: Some(0.8),
                    children: vec![TreeNode::leaf("tissue", Some(0.5))],
                },
                TreeNode::leaf("mind", Some(0.7071)),
            ],
        }
    }

    #[test]
    fn test_console_lines() {
        let lines = console_lines(&sample());
        assert_eq!(
            lines,
            vec![
                "└── brain",
                "    ├── cortex (0.800)",
                "    │   └── tissue (0.500)",
                "    └── mind (0.707)",
            ]
        );
    }

    #[test]
    fn test_markdown() {
        let lines = to_markdown(&sample());
        assert_eq!(lines[0], "- **brain**");
        assert_eq!(lines[1], "  - **cortex** *(sim: 0.800)*");
        assert_eq!(lines[2], "    - **tissue** *(sim: 0.500)*");
        assert_eq!(lines[3], "  - **mind** *(sim: 0.707)*");
    }

    #[test]
    fn test_markdown_document_has_heading_per_root() {
        let mut trees = BTreeMap::new();
        trees.insert("brain".to_string(), sample());
        trees.insert("idea".to_string(), TreeNode::leaf("idea", None));
        let doc = markdown_document(&trees);
        assert!(doc.starts_with("# brain\n- **brain**"));
        assert!(doc.contains("\n# idea\n- **idea**"));
    }

    #[test]
    fn test_json_keeps_tree_shape() {
        let mut trees = BTreeMap::new();
        trees.insert("brain".to_string(), sample());
        let json = to_json(&trees).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let tree = &value["brain"];
        assert_eq!(tree["token"], "brain");
        assert!(tree["similarity_to_parent"].is_null());
        assert_eq!(tree["children"][0]["children"][0]["token"], "tissue");

        let back: BTreeMap<String, TreeNode> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trees);
    }

    #[test]
    fn test_simple_node_ids_are_preorder() {
        let simple = SimpleNode::from_tree(&sample());
        let value = serde_json::to_value(&simple).unwrap();
        assert_eq!(value["Id"], 1);
        assert_eq!(value["word"], "brain");
        assert_eq!(value["children"][0]["Id"], 2);
        assert_eq!(value["children"][0]["children"][0]["Id"], 3);
        assert_eq!(value["children"][1]["Id"], 4);
        assert_eq!(value["children"][1]["word"], "mind");
    }
}
