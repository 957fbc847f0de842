//! The Inform service binary: consumes the Inform queue and sends the
//! lock-guarded notification email for each message (§4.5), alongside a
//! small `/live` + `/metrics` HTTP surface.

use anyhow::Context;
use axum::Router;
use bigtts_config::Config;
use bigtts_http::{live, logging, metrics, serve};
use bigtts_inform::{InformError, LettreSender, TemplateEmailMaker, Worker};
use bigtts_queue::{MessageBus, RedisBus};
use bigtts_store::RedisStore;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How long `consume_inform` blocks per poll before the loop re-checks the
/// stop signal.
const POLL_INTERVAL_SECS: f64 = 1.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	logging::init_tracing(config.rust_log.as_deref(), config.log_json);

	tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bigtts-inform");

	let bus = Arc::new(RedisBus::new(&config.message_server_url).context("connecting to the message bus")?);
	let request_store = Arc::new(RedisStore::new(&config.store_url).context("connecting to the request store")?);
	let lock_store = request_store.clone();

	let templater = Arc::new(TemplateEmailMaker::new(config.worker_task_name.clone()));
	let sender = Arc::new(LettreSender::new(&config.smtp_host, config.smtp_port, config.smtp_user.as_deref(), config.smtp_pass.as_deref(), &config.smtp_from).context("building SMTP transport")?);
	let timezone = chrono_tz::Tz::from_str(&config.worker_location).unwrap_or(chrono_tz::UTC);

	let worker = Arc::new(Worker::new(request_store, lock_store, templater, sender, timezone));

	let stop = CancellationToken::new();
	let shutdown = stop.clone();
	tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("shutdown signal received");
		shutdown.cancel();
	});

	let consume_stop = stop.clone();
	let consume_bus = Arc::clone(&bus);
	let consume_task = tokio::spawn(async move { run_consume_loop(consume_bus, worker, consume_stop).await });

	let metrics = metrics::ServiceMetrics::new("bigtts-inform");
	let router = Router::new().merge(live::router()).merge(metrics::router(metrics.registry));

	serve::serve_with_shutdown(router, config.port, stop).await?;
	consume_task.await.context("inform consume loop panicked")?;
	Ok(())
}

async fn run_consume_loop(bus: Arc<dyn MessageBus>, worker: Arc<Worker>, stop: CancellationToken) {
	tracing::info!("inform consume loop started");
	loop {
		if stop.is_cancelled() {
			break;
		}
		match bus.consume_inform(POLL_INTERVAL_SECS).await {
			Ok(Some(delivery)) => {
				let redelivered = delivery.redelivered;
				let msg = delivery.msg.clone();
				match worker.process(&msg).await {
					Ok(_outcome) => {
						if let Err(e) = bus.ack_inform(delivery).await {
							tracing::error!(id = %msg.id, error = %e, "failed to ack inform message");
						}
					}
					Err(err) => {
						let requeue = requeuable(&err) && !redelivered;
						tracing::error!(id = %msg.id, error = %err, requeue, "inform job failed");
						if let Err(e) = bus.nack_inform(delivery, requeue).await {
							tracing::error!(id = %msg.id, error = %e, "failed to nack inform message");
						}
					}
				}
			}
			Ok(None) => continue,
			Err(e) => {
				tracing::error!(error = %e, "failed to poll inform queue");
				tokio::time::sleep(std::time::Duration::from_millis(500)).await;
			}
		}
	}
	tracing::info!("inform consume loop stopped");
}

fn requeuable(err: &InformError) -> bool {
	err.is_redeliverable()
}
