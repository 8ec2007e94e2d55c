// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use fabstir_detect_node::{api::http_server, config::ServiceConfig, version};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("Starting {}", version::get_version_string());

    let config = ServiceConfig::from_env();
    tracing::info!(
        "Model path: {}, port: {}",
        config.model_path.display(),
        config.api_port
    );

    http_server::start_server(config).await
}
