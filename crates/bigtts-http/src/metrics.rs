use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

/// `GET /metrics`, exporting whatever counters/gauges the caller registered
/// under a service-scoped `Registry` (§6: "Prometheus metrics under a
/// service-scoped prefix"), mirroring `task_queue::pool::WorkerPool`'s use
/// of `prometheus::Registry`.
pub fn router(registry: Arc<Registry>) -> Router {
	Router::new().route("/metrics", get(metrics)).with_state(registry)
}

async fn metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
	let encoder = TextEncoder::new();
	let families = registry.gather();
	let mut buf = Vec::new();
	if let Err(e) = encoder.encode(&families, &mut buf) {
		tracing::error!(error = %e, "failed to encode metrics");
	}
	([("content-type", encoder.format_type().to_string())], buf)
}

/// Builds a `Registry` plus the handful of counters every stage handler /
/// worker in this workspace reports, with names prefixed by `service`
/// (mirrors `worker_pool_*` naming in `task_queue::pool::WorkerPool`).
pub struct ServiceMetrics {
	pub registry: Arc<Registry>,
	pub jobs_processed: prometheus::Counter,
	pub job_errors: prometheus::Counter,
}

impl ServiceMetrics {
	/// # Panics
	/// Panics if the metric names collide within the registry (a
	/// programmer error, not a runtime condition).
	#[must_use]
	pub fn new(service: &str) -> Self {
		let registry = Registry::new();
		let jobs_processed = prometheus::Counter::new(format!("{service}_jobs_processed_total"), "Total jobs processed").unwrap();
		let job_errors = prometheus::Counter::new(format!("{service}_job_errors_total"), "Total job processing errors").unwrap();
		registry.register(Box::new(jobs_processed.clone())).unwrap();
		registry.register(Box::new(job_errors.clone())).unwrap();
		Self { registry: Arc::new(registry), jobs_processed, job_errors }
	}
}
