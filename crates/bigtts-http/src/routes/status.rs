use crate::error::Error;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use bigtts_store::StatusStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct StatusState {
	pub status_store: Arc<dyn StatusStore>,
}

pub fn router(state: StatusState) -> Router {
	Router::new().route("/status/:id", get(status)).with_state(state)
}

#[derive(Serialize)]
struct StatusResponse {
	status: Option<String>,
	error: Option<String>,
}

async fn status(State(state): State<StatusState>, Path(id): Path<String>) -> Result<Json<StatusResponse>, Error> {
	let row = state
		.status_store
		.get(&id)
		.await
		.map_err(|e| Error::Internal(format!("can't read status: {e}")))?
		.ok_or_else(|| Error::BadRequest(format!("unknown id {id:?}")))?;

	Ok(Json(StatusResponse { status: row.stage().map(|s| s.as_str().to_string()), error: row.error().map(str::to_string) }))
}
