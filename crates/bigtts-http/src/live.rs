use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// `GET /live`, identical across every HTTP-fronted service (§6).
pub fn router() -> Router {
	Router::new().route("/live", get(live))
}

async fn live() -> impl IntoResponse {
	Json(json!({"service": "OK"}))
}
