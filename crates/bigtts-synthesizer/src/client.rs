//! The remote per-chunk synthesis call (§4.3, §6): `POST <synthURL>` JSON
//! in, base64 audio JSON out. HTTP 4xx is classified non-restorable (the
//! caller's problem, usage must not be restored); anything else non-2xx or
//! a 2xx with a bad body is retryable.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Per-call timeout (§5): 10 minutes.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(600);
/// Cap on how much of a non-2xx response body is read into the error
/// message, mirroring the original's bounded error-body read.
const MAX_ERROR_BODY: usize = 4096;

#[derive(Error, Debug)]
pub enum SynthesizeError {
	#[error("remote synthesis rejected the request: {0}")]
	NonRestorable(String),
	#[error("remote synthesis call failed: {0}")]
	Retryable(String),
}

/// Maps a synthesizer call outcome onto the shared error taxonomy (§7).
#[must_use]
pub fn error_class(err: &SynthesizeError) -> bigtts_model::ErrorClass {
	match err {
		SynthesizeError::NonRestorable(_) => bigtts_model::ErrorClass::TerminalNonRestorable,
		SynthesizeError::Retryable(_) => bigtts_model::ErrorClass::Transient,
	}
}

#[derive(Debug, Clone)]
pub struct SynthesizeRequest<'a> {
	pub text: &'a str,
	pub output_format: &'a str,
	pub voice: &'a str,
	pub speed: f64,
	pub save_request: bool,
	pub save_tags: &'a [String],
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
	text: &'a str,
	#[serde(rename = "outputFormat")]
	output_format: &'a str,
	voice: &'a str,
	speed: f64,
	#[serde(rename = "saveRequest")]
	save_request: bool,
	priority: u32,
}

#[derive(Deserialize)]
struct RemoteResponse {
	#[serde(rename = "audioAsString", default)]
	audio_as_string: String,
	#[serde(default)]
	error: Option<String>,
}

/// Dynamic-dispatch seam (§9 design note) over the remote synthesis call,
/// so the bounded-parallel driver can be exercised against a stand-in.
#[async_trait]
pub trait SynthesizeClient: Send + Sync {
	async fn synthesize(&self, req: &SynthesizeRequest<'_>) -> Result<Vec<u8>, SynthesizeError>;
}

pub struct HttpSynthesizeClient {
	client: reqwest::Client,
	url: String,
}

impl HttpSynthesizeClient {
	/// # Panics
	/// Panics if the underlying `reqwest::Client` fails to build (invalid
	/// TLS config on the host), mirroring `reqwest::Client::new`'s own
	/// panic contract.
	#[must_use]
	pub fn new(url: String) -> Self {
		let client = reqwest::Client::builder().timeout(CALL_TIMEOUT).build().expect("failed to build http client");
		Self { client, url }
	}
}

#[async_trait]
impl SynthesizeClient for HttpSynthesizeClient {
	async fn synthesize(&self, req: &SynthesizeRequest<'_>) -> Result<Vec<u8>, SynthesizeError> {
		tracing::info!(url = %bigtts_http::sanitize_url(&self.url), voice = req.voice, "calling remote synthesis");

		let body = RemoteRequest { text: req.text, output_format: req.output_format, voice: req.voice, speed: req.speed, save_request: req.save_request, priority: 300 };

		let mut request = self.client.post(&self.url).json(&body);
		if !req.save_tags.is_empty() {
			request = request.header("x-tts-save-tags", req.save_tags.join(","));
		}

		let response = request.send().await.map_err(|e| SynthesizeError::Retryable(e.to_string()))?;
		let status = response.status();

		if !status.is_success() {
			let body = read_bounded_body(response).await;
			let msg = format!("remote synthesis returned {status}: {body}");
			return if status.is_client_error() { Err(SynthesizeError::NonRestorable(msg)) } else { Err(SynthesizeError::Retryable(msg)) };
		}

		let parsed: RemoteResponse = response.json().await.map_err(|e| SynthesizeError::Retryable(format!("can't decode response: {e}")))?;
		if let Some(err) = parsed.error.filter(|e| !e.is_empty()) {
			return Err(SynthesizeError::Retryable(format!("remote synthesis reported an error: {err}")));
		}
		base64::engine::general_purpose::STANDARD.decode(parsed.audio_as_string).map_err(|e| SynthesizeError::Retryable(format!("can't decode audio: {e}")))
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

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_class_maps_4xx_to_non_restorable() {
		let err = SynthesizeError::NonRestorable("bad request".into());
		assert_eq!(error_class(&err), bigtts_model::ErrorClass::TerminalNonRestorable);
	}

	#[test]
	fn error_class_maps_other_failures_to_transient() {
		let err = SynthesizeError::Retryable("timeout".into());
		assert_eq!(error_class(&err), bigtts_model::ErrorClass::Transient);
	}
}
