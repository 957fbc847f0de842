use crate::error::StoreError;
use crate::traits::{EmailLockStore, RequestStore, StatusStore};
use async_trait::async_trait;
use bigtts_model::{EmailLockState, Request, Status};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Single-process store used by tests and the integration suite. Keeps all
/// three collections (`requests`, `status`, `emailLock`) in one struct so a
/// test can share one handle the way production code shares one Redis
/// connection.
#[derive(Default)]
pub struct InMemoryStore {
	requests: Mutex<HashMap<String, Request>>,
	statuses: Mutex<HashMap<String, Status>>,
	locks: Mutex<HashMap<(String, String), EmailLockState>>,
}

impl InMemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl RequestStore for InMemoryStore {
	async fn save(&self, req: &Request) -> Result<(), StoreError> {
		self.requests.lock().unwrap_or_else(|e| e.into_inner()).insert(req.id.clone(), req.clone());
		Ok(())
	}

	async fn get(&self, id: &str) -> Result<Option<Request>, StoreError> {
		Ok(self.requests.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned())
	}

	async fn delete(&self, id: &str) -> Result<(), StoreError> {
		self.requests.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
		Ok(())
	}

	async fn ids_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
		Ok(self
			.requests
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.values()
			.filter(|r| r.created_at < cutoff)
			.map(|r| r.id.clone())
			.collect())
	}
}

#[async_trait]
impl StatusStore for InMemoryStore {
	async fn save(&self, status: &Status) -> Result<(), StoreError> {
		self.statuses.lock().unwrap_or_else(|e| e.into_inner()).insert(status.id.clone(), status.clone());
		Ok(())
	}

	async fn get(&self, id: &str) -> Result<Option<Status>, StoreError> {
		Ok(self.statuses.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned())
	}

	async fn delete(&self, id: &str) -> Result<(), StoreError> {
		self.statuses.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
		Ok(())
	}
}

#[async_trait]
impl EmailLockStore for InMemoryStore {
	async fn lock(&self, id: &str, kind: &str) -> Result<(), StoreError> {
		let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
		let key = (id.to_string(), kind.to_string());
		if locks.get(&key) == Some(&EmailLockState::Sent) {
			return Err(StoreError::AlreadySent);
		}
		locks.insert(key, EmailLockState::Acquired);
		Ok(())
	}

	async fn unlock(&self, id: &str, kind: &str, state: EmailLockState) -> Result<(), StoreError> {
		self.locks.lock().unwrap_or_else(|e| e.into_inner()).insert((id.to_string(), kind.to_string()), state);
		Ok(())
	}

	async fn delete(&self, id: &str) -> Result<(), StoreError> {
		self.locks.lock().unwrap_or_else(|e| e.into_inner()).retain(|(rid, _), _| rid != id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bigtts_model::{OutputFormat, Stage};

	fn req(id: &str) -> Request {
		Request {
			id: id.to_string(),
			voice: "astra".into(),
			speed: 1.0,
			output_format: OutputFormat::Mp3,
			save_request: false,
			save_tags: vec![],
			email: None,
			uploaded_filename: None,
			created_at: Utc::now(),
			request_id: None,
		}
	}

	#[tokio::test]
	async fn save_and_get_roundtrip() {
		let store = InMemoryStore::new();
		store.save(&req("id1")).await.unwrap();
		let got = store.get("id1").await.unwrap();
		assert_eq!(got.map(|r| r.id), Some("id1".to_string()));
	}

	#[tokio::test]
	async fn status_save_overwrites_previous_value() {
		let store = InMemoryStore::new();
		store.save(&Status::at_stage("id1", Stage::Split)).await.unwrap();
		store.save(&Status::failed("id1", "boom")).await.unwrap();
		let got = store.get("id1").await.unwrap().unwrap();
		assert_eq!(got.error(), Some("boom"));
		assert_eq!(got.stage(), None);
	}

	#[tokio::test]
	async fn lock_rejects_when_already_sent() {
		let store = InMemoryStore::new();
		EmailLockStore::lock(&store, "id1", "Started").await.unwrap();
		store.unlock("id1", "Started", EmailLockState::Sent).await.unwrap();
		let err = EmailLockStore::lock(&store, "id1", "Started").await.unwrap_err();
		assert!(matches!(err, StoreError::AlreadySent));
	}

	#[tokio::test]
	async fn lock_allows_reacquire_after_failed_send() {
		let store = InMemoryStore::new();
		EmailLockStore::lock(&store, "id1", "Started").await.unwrap();
		store.unlock("id1", "Started", EmailLockState::Acquired).await.unwrap();
		EmailLockStore::lock(&store, "id1", "Started").await.unwrap();
	}

	#[tokio::test]
	async fn ids_older_than_filters_by_created_at() {
		let store = InMemoryStore::new();
		let mut old = req("old");
		old.created_at = Utc::now() - chrono::Duration::days(10);
		store.save(&old).await.unwrap();
		store.save(&req("new")).await.unwrap();

		let cutoff = Utc::now() - chrono::Duration::days(1);
		let ids = store.ids_older_than(cutoff).await.unwrap();
		assert_eq!(ids, vec!["old".to_string()]);
	}
}
