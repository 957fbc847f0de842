//! The Upload service binary: serves `POST /upload`, `/live`, and
//! `/metrics`, mirroring `apps/servers/file_host`'s wiring shape.

use anyhow::Context;
use axum::Router;
use bigtts_config::Config;
use bigtts_http::routes::upload::{self, UploadState};
use bigtts_http::{live, logging, metrics, serve};
use bigtts_queue::RedisBus;
use bigtts_store::RedisStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);
	config.validate_templates().context("invalid path template in configuration")?;

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-upload");

	let request_store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the request store")?);
	let bus = Arc::new(RedisBus::new(&config.message_server_url).context("connecting to the message bus")?);

	let state = UploadState {
		request_store,
		bus,
		known_voices: config.synthesis_voices.clone(),
		default_voice: config.synthesis_default_voice.clone(),
		default_format: config.synthesis_default_format.clone(),
		upload_path_template: config.splitter_in_template.clone(),
	};

	let metrics = metrics::ServiceMetrics::new("bigtts-upload");
	let router = Router::new().merge(upload::router(state)).merge(live::router()).merge(metrics::router(metrics.registry));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	serve::serve_with_shutdown(router, config.port, stop).await
}
