//! The Usage Restorer (§4.6): on a Fail queue message, parse `requestID` as
//! `service:rest` (split once on `:`) and POST a restore call to the
//! configured admin/billing URL. An empty `requestID` is a no-op success —
//! there was never any usage to restore.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Usage-restore call timeout (§5).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY: usize = 4096;

#[derive(Error, Debug)]
pub enum UsageError {
	#[error("invalid requestID {0:?}, expected 'service:rest'")]
	InvalidRequestId(String),
	#[error("restore call failed: {0}")]
	Call(String),
}

#[async_trait]
pub trait UsageRestorer: Send + Sync {
	/// Restores previously charged usage for `request_id`, given the error
	/// that caused the terminal failure.
	///
	/// # Errors
	/// Returns `UsageError::InvalidRequestId` if `request_id` isn't
	/// `service:rest`, or `UsageError::Call` on a non-2xx/network failure.
	async fn restore(&self, request_id: &str, error: &str) -> Result<(), UsageError>;
}

/// Splits `service:rest` on the first `:`, rejecting an empty request ID
/// (a no-op handled by the caller before reaching this function) or either
/// half being blank.
fn parse_request_id(request_id: &str) -> Result<(&str, &str), UsageError> {
	let (service, rest) = request_id.split_once(':').ok_or_else(|| UsageError::InvalidRequestId(request_id.to_string()))?;
	if service.is_empty() || rest.is_empty() {
		return Err(UsageError::InvalidRequestId(request_id.to_string()));
	}
	Ok((service, rest))
}

#[derive(Serialize)]
struct RestoreBody<'a> {
	error: &'a str,
}

pub struct HttpUsageRestorer {
	client: reqwest::Client,
	admin_url: String,
}

impl HttpUsageRestorer {
	/// # Panics
	/// Panics if the underlying `reqwest::Client` fails to build.
	#[must_use]
	pub fn new(admin_url: String) -> Self {
		let client = reqwest::Client::builder().timeout(CALL_TIMEOUT).build().expect("failed to build http client");
		Self { client, admin_url }
	}
}

#[async_trait]
impl UsageRestorer for HttpUsageRestorer {
	async fn restore(&self, request_id: &str, error: &str) -> Result<(), UsageError> {
		if request_id.is_empty() {
			tracing::warn!("no requestID, nothing to restore");
			return Ok(());
		}
		let (service, rest) = parse_request_id(request_id)?;
		let url = format!("{}/{service}/restore/{rest}", self.admin_url.trim_end_matches('/'));
		tracing::info!(url = %bigtts_http::sanitize_url(&url), "calling usage restore");

		let response = self.client.post(&url).json(&RestoreBody { error }).send().await.map_err(|e| UsageError::Call(e.to_string()))?;
		let status = response.status();
		if status.is_success() {
			return Ok(());
		}
		let body = read_bounded_body(response).await;
		Err(UsageError::Call(format!("{url} returned {status}: {body}")))
	}
}

async fn read_bounded_body(response: reqwest::Response) -> String {
	match response.bytes().await {
		Ok(bytes) => {
			let truncated = &bytes[..bytes.len().min(MAX_ERROR_BODY)];
			String::from_utf8_lossy(truncated).into_owned()
		}
		Err(e) => format!("<unreadable body: {e}>"),
	}
}
