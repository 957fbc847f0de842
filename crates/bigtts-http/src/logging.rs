//! Tracing initialization shared by every binary (ambient stack: logging),
//! following `nest::init_tracing`'s `EnvFilter` + optional JSON formatting
//! shape.

use std::str::FromStr;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Installs a global tracing subscriber. `rust_log` follows `EnvFilter`
/// syntax (e.g. `"info,bigtts_coordinator=debug"`, falling back to `info`
/// if unset or unparseable); `log_json` selects JSON formatting over the
/// default pretty formatter.
pub fn init_tracing(rust_log: Option<&str>, log_json: bool) {
	let filter = rust_log.and_then(|s| EnvFilter::from_str(s).ok()).unwrap_or_else(|| EnvFilter::new("info"));

	let registry = tracing_subscriber::registry();
	if log_json {
		registry
			.with(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			)
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().pretty()).with_filter(filter))
			.init();
	}
}
