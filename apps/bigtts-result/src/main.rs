//! The Result service binary: serves `GET|HEAD /result/{id}`, `/live`, and
//! `/metrics`.

use anyhow::Context;
use axum::Router;
use bigtts_config::Config;
use bigtts_http::routes::result::{self, ResultState};
use bigtts_http::{live, logging, metrics, serve};
use bigtts_store::RedisStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);
	config.validate_templates().context("invalid path template in configuration")?;

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-result");

	let request_store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the request store")?);
	let state = ResultState { request_store, join_out_template: config.joiner_out_template.clone() };

	let metrics = metrics::ServiceMetrics::new("bigtts-result");
	let router = Router::new().merge(result::router(state)).merge(live::router()).merge(metrics::router(metrics.registry));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	serve::serve_with_shutdown(router, config.port, stop).await
}
