//! The Cleaner service binary: serves `DELETE /delete/{id}` on demand and
//! runs the periodic sweep loop (§4.7) alongside it.

use anyhow::Context;
use axum::Router;
use bigtts_cleaner::{Cleaner, DeleteHandlerAdapter, Sweeper, TokioFs};
use bigtts_config::Config;
use bigtts_http::routes::clean::{self, CleanState};
use bigtts_http::{live, logging, metrics, serve};
use bigtts_store::RedisStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-cleaner");

	let store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the store")?);
	let fs = Arc::new(TokioFs);
	let cleaner = Arc::new(Cleaner::new(store.clone(), store.clone(), store.clone(), fs.clone(), config.file_storage_patterns.clone()));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	let sweeper = Arc::new(Sweeper::new(config.cleaner_mode, Arc::clone(&cleaner), store, fs, config.file_storage_path.clone(), config.timer_run_every, config.timer_expire));
	let sweep_stop = stop.clone();
	let sweep_task = tokio::spawn(async move { sweeper.run(&sweep_stop).await });

	let state = CleanState { handler: Arc::new(DeleteHandlerAdapter(cleaner)) };
	let metrics = metrics::ServiceMetrics::new("bigtts-cleaner");
	let router = Router::new().merge(clean::router(state)).merge(live::router()).merge(metrics::router(metrics.registry));

	serve::serve_with_shutdown(router, config.port, stop).await?;
	sweep_task.await.context("cleaner sweep loop panicked")?;
	Ok(())
}
