//! The Status service binary: serves `GET /status/{id}`, `/live`, and
//! `/metrics`.

use anyhow::Context;
use axum::Router;
use bigtts_config::Config;
use bigtts_http::routes::status::{self, StatusState};
use bigtts_http::{live, logging, metrics, serve};
use bigtts_store::RedisStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-status");

	let status_store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the status store")?);
	let state = StatusState { status_store };

	let metrics = metrics::ServiceMetrics::new("bigtts-status");
	let router = Router::new().merge(status::router(state)).merge(live::router()).merge(metrics::router(metrics.registry));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	serve::serve_with_shutdown(router, config.port, stop).await
}
