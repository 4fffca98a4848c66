//! wordtree server: HTTP front end for the browser visualisation.
//!
//! Thin axum server over wordtree_lib. Vectors and filter are loaded once and
//! shared read-only; every request builds its tree with its own state.
//!
//! Usage:
//!   WORDTREE_VECTORS=/path/to/vectors.txt WORDTREE_BIND=127.0.0.1:8000 wordtree-server
//!
//! Or with args:
//!   wordtree-server --settings /path/to/settings.json --bind 0.0.0.0:8000

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;
use wordtree_lib::render::SimpleNode;
use wordtree_lib::settings::Settings;
use wordtree_lib::{
    Canonicalizer, EmbeddingProvider, KeyedVectors, TreeBuilder, TreeConfig, WordFilter,
};

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
struct AppState {
    vectors: Arc<KeyedVectors>,
    filter: Arc<WordFilter>,
    canonicalizer: Arc<Canonicalizer>,
    config: TreeConfig,
    output_path: PathBuf,
}

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError(StatusCode::INTERNAL_SERVER_ERROR, s)
    }
}

fn not_found(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::NOT_FOUND, msg.into())
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Deserialize)]
struct WordRequest {
    word: Option<String>,
}

#[derive(Serialize)]
struct WordResponse {
    word: String,
    status: String,
    message: String,
    nodes: usize,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    vocabulary: usize,
}

// ============================================================================
// Handlers
// ============================================================================

// POST /api/word
async fn word_handler(
    State(state): State<AppState>,
    Json(req): Json<WordRequest>,
) -> Result<Json<WordResponse>, AppError> {
    let word = req.word.unwrap_or_default().trim().to_string();
    if word.is_empty() {
        return Err(bad_request("no word provided"));
    }

    let build_state = state.clone();
    let root = word.clone();
    let tree = tokio::task::spawn_blocking(move || {
        let builder = TreeBuilder::new(
            build_state.vectors.as_ref(),
            build_state.filter.as_ref(),
            build_state.canonicalizer.as_ref(),
            build_state.config.clone(),
        )
        .map_err(|e| e.to_string())?;
        Ok::<_, String>(builder.build(&root))
    })
    .await
    .map_err(|e| format!("Tree build panicked: {}", e))??;

    let nodes = tree.node_count();
    let mut trees = BTreeMap::new();
    trees.insert(word.clone(), SimpleNode::from_tree(&tree));
    let content = serde_json::to_string_pretty(&trees).map_err(|e| e.to_string())?;
    tokio::fs::write(&state.output_path, content)
        .await
        .map_err(|e| format!("Failed to write {}: {}", state.output_path.display(), e))?;

    tracing::info!(word = %word, nodes, path = %state.output_path.display(), "saved tree");

    Ok(Json(WordResponse {
        message: format!("Got \"{}\" on the backend", word),
        word,
        status: "received".to_string(),
        nodes,
    }))
}

// GET /trees.json
async fn trees_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    match tokio::fs::read_to_string(&state.output_path).await {
        Ok(content) => Ok((
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            content,
        )
            .into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found("no tree built yet")),
        Err(e) => Err(format!("Failed to read {}: {}", state.output_path.display(), e).into()),
    }
}

// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        vocabulary: state.vectors.len(),
    })
}

// ============================================================================
// Router + main
// ============================================================================

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/word", post(word_handler))
        .route("/trees.json", get(trees_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Simple arg parsing
    let args: Vec<String> = std::env::args().collect();
    let mut settings_arg: Option<PathBuf> = None;
    let mut bind_arg: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" if i + 1 < args.len() => {
                settings_arg = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(args[i + 1].clone());
                i += 2;
            }
            "--help" | "-h" => {
                println!("wordtree-server - similarity tree HTTP API");
                println!();
                println!("Usage: wordtree-server [--settings PATH] [--bind ADDR:PORT]");
                println!();
                println!("Environment variables:");
                println!("  WORDTREE_VECTORS     word2vec text file");
                println!("  WORDTREE_DICTIONARY  word list for spelling checks");
                println!("  WORDTREE_BIND        Bind address (default: 127.0.0.1:8000)");
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let mut settings = match Settings::load_with_env(settings_arg.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to load settings");
            std::process::exit(1);
        }
    };
    if let Some(bind) = bind_arg {
        settings.bind = bind;
    }

    let config = settings.tree_config();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid tree settings");
        std::process::exit(1);
    }

    let Some(vectors_path) = settings.vectors_path.clone() else {
        tracing::error!("no vectors file configured (set WORDTREE_VECTORS)");
        std::process::exit(1);
    };
    let vectors = match KeyedVectors::load(&vectors_path) {
        Ok(kv) => Arc::new(kv),
        Err(e) => {
            tracing::error!(error = %e, "failed to load vectors");
            std::process::exit(1);
        }
    };

    let state = AppState {
        vectors,
        filter: Arc::new(WordFilter::from_config(&settings.filter_config())),
        canonicalizer: Arc::new(Canonicalizer::from_path(settings.lemma_path.as_deref())),
        config,
        output_path: settings.output_path.clone(),
    };

    let listener = match tokio::net::TcpListener::bind(&settings.bind).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(bind = %settings.bind, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(bind = %settings.bind, "listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    };
    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(error = %e, "server error");
    }
}
