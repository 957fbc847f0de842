use crate::error::Error;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use bigtts_messages::{JobMessage, Queue};
use bigtts_model::{OutputFormat, Request};
use bigtts_queue::MessageBus;
use bigtts_store::RequestStore;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Everything the upload route needs injected: where to persist the
/// `Request` row, which bus to enqueue `Upload` on, and the handful of
/// config values (§6) that gate validation.
#[derive(Clone)]
pub struct UploadState {
	pub request_store: Arc<dyn RequestStore>,
	pub bus: Arc<dyn MessageBus>,
	pub known_voices: Vec<String>,
	pub default_voice: String,
	pub default_format: String,
	/// `{}`=ID templated path the raw upload text is written to, matching
	/// `splitter.inTemplate` (§3's "input text" layout) so the Splitter
	/// finds it downstream.
	pub upload_path_template: String,
}

pub fn router(state: UploadState) -> Router {
	Router::new().route("/upload", post(upload)).with_state(state)
}

#[derive(Serialize)]
struct UploadResponse {
	id: String,
}

struct ParsedForm {
	file_name: String,
	text: Vec<u8>,
	voice: String,
	speed: f64,
	output_format: OutputFormat,
	save_request: bool,
	email: Option<String>,
}

async fn upload(State(state): State<UploadState>, headers: HeaderMap, multipart: Multipart) -> Result<Json<UploadResponse>, Error> {
	let form = parse_multipart(multipart, &headers, &state).await?;
	let id = Uuid::new_v4().to_string();

	let save_tags = header_csv(&headers, "x-tts-save-tags");
	let request_id = headers.get("x-doorman-requestid").and_then(|v| v.to_str().ok()).map(str::to_string);

	let req = Request {
		id: id.clone(),
		voice: form.voice.clone(),
		speed: form.speed,
		output_format: form.output_format,
		save_request: form.save_request,
		save_tags: save_tags.clone(),
		email: form.email,
		uploaded_filename: Some(form.file_name),
		created_at: Utc::now(),
		request_id: request_id.clone(),
	};

	state.request_store.save(&req).await.map_err(|e| Error::Internal(format!("can't save request: {e}")))?;

	let upload_path = state.upload_path_template.replace("{}", &id);
	if let Some(parent) = std::path::Path::new(&upload_path).parent() {
		tokio::fs::create_dir_all(parent).await.map_err(|e| Error::Internal(format!("can't create upload dir: {e}")))?;
	}
	tokio::fs::write(&upload_path, &form.text).await.map_err(|e| Error::Internal(format!("can't write upload text: {e}")))?;

	let job = JobMessage {
		id,
		voice: form.voice,
		speed: form.speed,
		save_request: form.save_request,
		output_format: form.output_format.extension().to_string(),
		save_tags,
		request_id,
		error: None,
	};
	state.bus.publish_job(Queue::Upload, &job).await.map_err(|e| Error::Internal(format!("can't enqueue upload: {e}")))?;

	Ok(Json(UploadResponse { id: job.id }))
}

async fn parse_multipart(mut multipart: Multipart, headers: &HeaderMap, state: &UploadState) -> Result<ParsedForm, Error> {
	let mut file_name = None;
	let mut text = None;
	let mut voice = None;
	let mut speed_raw = None;
	let mut format_raw = None;
	let mut save_request_raw = None;
	let mut email = None;

	while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest(format!("bad multipart body: {e}")))? {
		match field.name().unwrap_or_default() {
			"file" => {
				let name = field.file_name().unwrap_or_default().to_string();
				if !name.ends_with(".txt") {
					return Err(Error::BadRequest("file must have a .txt extension".into()));
				}
				file_name = Some(name);
				text = Some(field.bytes().await.map_err(|e| Error::BadRequest(format!("bad file field: {e}")))?.to_vec());
			}
			"voice" => voice = Some(text_field(field).await?),
			"speed" => speed_raw = Some(text_field(field).await?),
			"outputFormat" => format_raw = Some(text_field(field).await?),
			"saveRequest" => save_request_raw = Some(text_field(field).await?),
			"email" => email = Some(text_field(field).await?),
			_ => {}
		}
	}

	let text = text.ok_or_else(|| Error::BadRequest("missing required file field".into()))?;
	let file_name = file_name.ok_or_else(|| Error::BadRequest("missing required file field".into()))?;

	let voice = voice.unwrap_or_else(|| state.default_voice.clone());
	if !state.known_voices.iter().any(|v| v == &voice) {
		return Err(Error::BadRequest(format!("unknown voice {voice:?}")));
	}

	let speed = parse_speed(speed_raw.as_deref().unwrap_or(""))?;

	let format_str = format_raw
		.filter(|s| !s.is_empty())
		.or_else(|| header_value(headers, "x-tts-default-output-format"))
		.unwrap_or_else(|| state.default_format.clone());
	let output_format = OutputFormat::parse(&format_str).ok_or_else(|| Error::BadRequest(format!("unknown output format {format_str:?}")))?;

	let save_request = parse_bool(save_request_raw.as_deref().unwrap_or("false"))?;
	let collect_data = header_value(headers, "x-tts-collect-data").unwrap_or_default();
	match (collect_data.as_str(), save_request) {
		("always", false) => return Err(Error::BadRequest("x-tts-collect-data=always conflicts with saveRequest=false".into())),
		("never", true) => return Err(Error::BadRequest("x-tts-collect-data=never conflicts with saveRequest=true".into())),
		_ => {}
	}

	let email = email.filter(|s| !s.is_empty());

	Ok(ParsedForm { file_name, text, voice, speed, output_format, save_request, email })
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, Error> {
	field.text().await.map_err(|e| Error::BadRequest(format!("bad form field: {e}")))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
	headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn header_csv(headers: &HeaderMap, name: &str) -> Vec<String> {
	header_value(headers, name)
		.map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
		.unwrap_or_default()
}

fn parse_speed(raw: &str) -> Result<f64, Error> {
	if raw.is_empty() {
		return Ok(1.0);
	}
	let v: f64 = raw.parse().map_err(|_| Error::BadRequest(format!("invalid speed {raw:?}")))?;
	if v.abs() < 1e-5 {
		return Ok(v);
	}
	if !(0.5..=2.0).contains(&v) {
		return Err(Error::BadRequest(format!("speed {v} out of range [0.5, 2.0]")));
	}
	Ok(v)
}

fn parse_bool(raw: &str) -> Result<bool, Error> {
	match raw {
		"true" | "1" => Ok(true),
		"false" | "0" => Ok(false),
		other => Err(Error::BadRequest(format!("invalid boolean {other:?}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_speed_empty_defaults_to_one() {
		assert_eq!(parse_speed("").unwrap(), 1.0);
	}

	#[test]
	fn parse_speed_near_zero_is_allowed() {
		assert_eq!(parse_speed("0.000001").unwrap(), 0.000001);
	}

	#[test]
	fn parse_speed_out_of_range_rejected() {
		assert!(parse_speed("3.0").is_err());
		assert!(parse_speed("0.1").is_err());
	}

	#[test]
	fn parse_speed_in_range_accepted() {
		assert_eq!(parse_speed("1.5").unwrap(), 1.5);
	}

	#[test]
	fn parse_bool_accepts_both_spellings() {
		assert!(parse_bool("true").unwrap());
		assert!(parse_bool("1").unwrap());
		assert!(!parse_bool("false").unwrap());
		assert!(!parse_bool("0").unwrap());
		assert!(parse_bool("yes").is_err());
	}
}
