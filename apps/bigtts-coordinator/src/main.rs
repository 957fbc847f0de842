//! The Pipeline Coordinator binary: runs the five stage consumer loops
//! (§4.1) alongside a small `/live` + `/metrics` HTTP surface.

use anyhow::Context;
use axum::Router;
use bigtts_config::Config;
use bigtts_coordinator::Coordinator;
use bigtts_http::{live, logging, metrics, serve};
use bigtts_queue::RedisBus;
use bigtts_store::RedisStore;
use bigtts_synthesizer::HttpSynthesizeClient;
use bigtts_usage::HttpUsageRestorer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);
	config.validate_templates().context("invalid path template in configuration")?;

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-coordinator");

	let bus = Arc::new(RedisBus::new(&config.message_server_url).context("connecting to the message bus")?);
	let status_store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the status store")?);

	let splitter = Arc::new(bigtts_splitter::Worker::new(config.splitter_in_template.clone(), config.splitter_out_template.clone()));

	let synth_client = Arc::new(HttpSynthesizeClient::new(config.synthesizer_url.clone()));
	let synthesizer = Arc::new(bigtts_synthesizer::Worker::new(synth_client, config.splitter_out_template.clone(), config.synthesizer_out_template.clone(), config.synthesizer_workers));

	let joiner = Arc::new(bigtts_joiner::Worker::new(config.synthesizer_out_template.clone(), config.joiner_out_template.clone(), config.joiner_work_template.clone(), config.joiner_metadata_pairs()));

	let usage_restorer = Arc::new(HttpUsageRestorer::new(config.doorman_url.clone()));

	let coordinator = Arc::new(Coordinator::new(bus, status_store, splitter, synthesizer, joiner, usage_restorer));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	let run_stop = stop.clone();
	let coordinator_task = tokio::spawn(async move { coordinator.run(run_stop).await });

	let metrics = metrics::ServiceMetrics::new("bigtts-coordinator");
	let router = Router::new().merge(live::router()).merge(metrics::router(metrics.registry));

	serve::serve_with_shutdown(router, config.port, stop).await?;
	coordinator_task.await.context("coordinator loop panicked")?;
	Ok(())
}
