use crate::error::Error;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::delete;
use axum::Router;
use std::sync::Arc;

/// The Cleaner's synchronous on-demand purge (§4.7: `DELETE /delete/{id}`),
/// implemented by `bigtts-cleaner`. Kept as a local trait so `bigtts-http`
/// doesn't need to depend on `bigtts-cleaner`.
#[async_trait]
pub trait DeleteHandler: Send + Sync {
	async fn delete(&self, id: &str) -> Result<(), String>;
}

#[derive(Clone)]
pub struct CleanState {
	pub handler: Arc<dyn DeleteHandler>,
}

pub fn router(state: CleanState) -> Router {
	Router::new().route("/delete/:id", delete(clean)).with_state(state)
}

async fn clean(State(state): State<CleanState>, Path(id): Path<String>) -> Result<&'static str, Error> {
	if id.is_empty() {
		return Err(Error::BadRequest("no id".into()));
	}
	state.handler.delete(&id).await.map_err(Error::Internal)?;
	Ok("deleted")
}
