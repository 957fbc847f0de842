use crate::error::StoreError;
use async_trait::async_trait;
use bigtts_model::{EmailLockState, Request, Status};
use chrono::{DateTime, Utc};

/// Persists upload-time request metadata. Never mutated by the core
/// pipeline after creation (§3).
#[async_trait]
pub trait RequestStore: Send + Sync {
	async fn save(&self, req: &Request) -> Result<(), StoreError>;
	async fn get(&self, id: &str) -> Result<Option<Request>, StoreError>;
	async fn delete(&self, id: &str) -> Result<(), StoreError>;
	/// IDs whose `created_at` is older than `cutoff`, for the Cleaner's DB
	/// mode (§4.7).
	async fn ids_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError>;
}

/// Persists the per-ID stage/error row (§3).
#[async_trait]
pub trait StatusStore: Send + Sync {
	async fn save(&self, status: &Status) -> Result<(), StoreError>;
	async fn get(&self, id: &str) -> Result<Option<Status>, StoreError>;
	async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Per-(id, type) email delivery lock guaranteeing at-most-one successful
/// send, even across concurrent consumers or redelivery (§4.5, §8 law 2).
#[async_trait]
pub trait EmailLockStore: Send + Sync {
	/// Creates the lock row in the `Acquired` state. Fails with
	/// `StoreError::AlreadySent` if the row already exists in the `Sent`
	/// state — the caller must treat that as "already delivered, skip".
	async fn lock(&self, id: &str, kind: &str) -> Result<(), StoreError>;
	/// Transitions an existing lock row to `state`.
	async fn unlock(&self, id: &str, kind: &str, state: EmailLockState) -> Result<(), StoreError>;
	/// Removes every lock row for `id` (Cleaner §4.7).
	async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
