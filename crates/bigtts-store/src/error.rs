use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
	#[error("no such record")]
	NotFound,
	#[error("email already sent, lock rejected")]
	AlreadySent,
	#[error("redis error: {0}")]
	Redis(#[from] redis::RedisError),
	#[error("serialization error: {0}")]
	Json(#[from] serde_json::Error),
}
