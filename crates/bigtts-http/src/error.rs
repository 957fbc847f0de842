use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The shared HTTP error type for every thin adapter route (upload, status,
/// result, clean). Mirrors the original's `echo.NewHTTPError` split between
/// 400 (bad input) and 500 (persistence/internal failure) from §6.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("{0}")]
	BadRequest(String),
	#[error("{0}")]
	Internal(String),
	#[error("not found")]
	NotFound,
}

impl Error {
	#[must_use]
	pub const fn status_code(&self) -> StatusCode {
		match self {
			Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::NotFound => StatusCode::NOT_FOUND,
		}
	}
}

#[derive(Serialize)]
struct ErrorBody {
	error: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		if matches!(self, Self::Internal(_)) {
			tracing::error!(error = %self, "request failed");
		}
		(self.status_code(), Json(ErrorBody { error: self.to_string() })).into_response()
	}
}
