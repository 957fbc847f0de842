use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
	#[error("redis error: {0}")]
	Redis(#[from] redis::RedisError),
	#[error("serialization error: {0}")]
	Json(#[from] serde_json::Error),
	#[error("bus is closed")]
	Closed,
}
