use crate::error::Error;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bigtts_store::RequestStore;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

#[derive(Clone)]
pub struct ResultState {
	pub request_store: Arc<dyn RequestStore>,
	/// `{}`=ID templated final-audio path, matching `joiner.outTemplate`
	/// plus the `result.<fmt>` filename from §3.
	pub join_out_template: String,
}

/// `axum`'s `get` method router also answers `HEAD` by dropping the body,
/// satisfying the spec's `GET|HEAD /result/{id}` contract with one route.
pub fn router(state: ResultState) -> Router {
	Router::new().route("/result/:id", get(result)).with_state(state)
}

async fn result(State(state): State<ResultState>, Path(id): Path<String>) -> Result<Response, Error> {
	let req = state
		.request_store
		.get(&id)
		.await
		.map_err(|e| Error::Internal(format!("can't read request: {e}")))?
		.ok_or_else(|| Error::BadRequest(format!("unknown id {id:?}")))?;

	let fmt = req.output_format.extension();
	let dir = state.join_out_template.replace("{}", &id);
	let path = std::path::Path::new(&dir).join(format!("result.{fmt}"));

	let file = tokio::fs::File::open(&path).await.map_err(|_| Error::BadRequest(format!("no result for {id:?}")))?;
	let stream = ReaderStream::new(file);
	let body = Body::from_stream(stream);

	let filename = format!("result.{fmt}");
	Ok((
		[
			(header::CONTENT_TYPE, mime_for(fmt)),
			(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"").as_str()),
		],
		body,
	)
		.into_response())
}

fn mime_for(fmt: &str) -> &'static str {
	match fmt {
		"m4a" => "audio/mp4",
		_ => "audio/mpeg",
	}
}
