#![forbid(unsafe_code)]
//! HTTP server for the StarChain registry.

use std::sync::Arc;
use starchain::api::{run_api_server, Node};
use starchain::blockchain::Blockchain;
use starchain::config::load_config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    info!(
        port = config.server.port,
        window_secs = config.ledger.challenge_window_secs,
        "starting StarChain registry"
    );

    let blockchain = Blockchain::with_config(config.ledger.clone())?;
    let node = Arc::new(Node::new(blockchain));

    run_api_server(node, &config.server).await
}
