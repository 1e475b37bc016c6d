//! REST API server for StarChain
//!
//! Exposes the registry over HTTP: block lookups, the ownership challenge,
//! star submission, per-owner listings and chain validation.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, Blockchain, StarEntry};
use crate::config::ServerConfig;
use crate::error::ChainError;

const BLOCK_NOT_FOUND: &str = "Block Not Found!";

/// Shared handle the handlers work against.
///
/// Registrations take the write half of the lock for the whole append; every
/// other route only reads.
#[derive(Clone)]
pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    start_time: Instant,
}

impl Node {
    pub fn new(blockchain: Blockchain) -> Self {
        Self::new_shared(Arc::new(RwLock::new(blockchain)))
    }

    /// Build a node around a ledger that other tasks also hold.
    pub fn new_shared(blockchain: Arc<RwLock<Blockchain>>) -> Self {
        Self {
            blockchain,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            // Lookups answer with a bare text body, not the JSON error envelope.
            ApiError::NotFound(msg) => return (StatusCode::NOT_FOUND, msg).into_response(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::BlockchainError(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ValidationRequest {
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitStarRequest {
    pub address: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
    pub star: Option<serde_json::Value>,
}

fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::InvalidInput(format!("Missing field: {}", name))),
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        // Block lookups
        .route("/block/height/:height", get(get_block_by_height))
        .route("/block/hash/:hash", get(get_block_by_hash))
        .route("/block/:height", get(get_block_by_height))
        .route("/blockchain/height", get(get_blockchain_height))
        // Registration
        .route("/requestValidation", post(request_validation))
        .route("/submitstar", post(submit_star))
        // Queries
        .route("/blocks/:address", get(get_stars_by_owner))
        .route("/validateChain", get(validate_chain))
        // System
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Bind and serve until the process is stopped.
pub async fn run_api_server(
    node: Arc<Node>,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "star registry listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.blockchain.read().await.current_height();
    Json(serde_json::json!({
        "status": "healthy",
        "height": height,
        "uptime_seconds": node.uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_blockchain_height(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.blockchain.read().await.current_height();
    Json(height)
}

async fn get_block_by_height(
    State(node): State<Arc<Node>>,
    Path(height): Path<String>,
) -> Result<Json<Block>, ApiError> {
    // Non-numeric heights cannot name a block.
    let height = height
        .parse::<u64>()
        .map_err(|_| ApiError::NotFound(BLOCK_NOT_FOUND.to_string()))?;

    let blockchain = node.blockchain.read().await;
    blockchain
        .get_block_by_height(height)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(BLOCK_NOT_FOUND.to_string()))
}

async fn get_block_by_hash(
    State(node): State<Arc<Node>>,
    Path(hash): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let blockchain = node.blockchain.read().await;
    blockchain
        .get_block_by_hash(&hash)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(BLOCK_NOT_FOUND.to_string()))
}

async fn request_validation(
    State(node): State<Arc<Node>>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let Json(req) = payload?;
    let address = require(req.address, "address")?;
    let blockchain = node.blockchain.read().await;
    Ok(Json(blockchain.request_ownership_verification(&address)))
}

async fn submit_star(
    State(node): State<Arc<Node>>,
    payload: Result<Json<SubmitStarRequest>, JsonRejection>,
) -> Result<Json<Block>, ApiError> {
    let Json(req) = payload?;
    let address = require(req.address, "address")?;
    let message = require(req.message, "message")?;
    let signature = require(req.signature, "signature")?;
    let star = req
        .star
        .ok_or_else(|| ApiError::InvalidInput("Missing field: star".to_string()))?;

    let mut blockchain = node.blockchain.write().await;
    let block = blockchain.submit_star(&address, &message, &signature, star)?;
    Ok(Json(block))
}

async fn get_stars_by_owner(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> Json<Vec<StarEntry>> {
    let blockchain = node.blockchain.read().await;
    let stars: Vec<StarEntry> = blockchain.get_stars_by_wallet_address(&address).collect();
    Json(stars)
}

async fn validate_chain(State(node): State<Arc<Node>>) -> Json<Vec<String>> {
    let errors = node.blockchain.read().await.validate_chain();
    Json(errors)
}
