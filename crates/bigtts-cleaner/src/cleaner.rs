//! The deletion itself (§4.7): every discovered ID, whichever mode found
//! it, gets the full purge — `Request`/`Status`/`EmailLock` store rows plus
//! every `{ID}`-templated filesystem pattern from configuration. This is
//! the "same deletion" the on-demand `DELETE /delete/{id}` route performs
//! synchronously.

use crate::fs::CleanFs;
use async_trait::async_trait;
use bigtts_store::{EmailLockStore, RequestStore, StatusStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("filesystem error removing {0:?}: {1}")]
	Fs(String, std::io::Error),
}

pub struct Cleaner {
	request_store: Arc<dyn RequestStore>,
	status_store: Arc<dyn StatusStore>,
	lock_store: Arc<dyn EmailLockStore>,
	fs: Arc<dyn CleanFs>,
	/// `{ID}`-templated path patterns, comma separated in configuration
	/// (`fileStorage.patterns`).
	patterns: Vec<String>,
}

impl Cleaner {
	#[must_use]
	pub fn new(request_store: Arc<dyn RequestStore>, status_store: Arc<dyn StatusStore>, lock_store: Arc<dyn EmailLockStore>, fs: Arc<dyn CleanFs>, patterns: Vec<String>) -> Self {
		Self { request_store, status_store, lock_store, fs, patterns }
	}

	/// Deletes every trace of `id`: the three store rows, then every
	/// templated filesystem pattern.
	///
	/// # Errors
	/// Returns `CleanError` on the first store or filesystem failure. A
	/// missing filesystem path is not itself an error (§`fs::CleanFs`).
	pub async fn clean(&self, id: &str) -> Result<(), CleanError> {
		tracing::info!(id, "cleaning request");
		self.request_store.delete(id).await?;
		self.status_store.delete(id).await?;
		self.lock_store.delete(id).await?;
		for pattern in &self.patterns {
			let path = pattern.replace("{ID}", id);
			self.fs.remove_path(&path).await.map_err(|e| CleanError::Fs(path.clone(), e))?;
		}
		Ok(())
	}
}

/// Adapts `Cleaner` to the `bigtts-http` clean route's `DeleteHandler` seam
/// so `apps/bigtts-cleaner` can wire it straight into the router without
/// `bigtts-http` depending on this crate.
pub struct DeleteHandlerAdapter(pub Arc<Cleaner>);

#[async_trait]
impl bigtts_http::routes::clean::DeleteHandler for DeleteHandlerAdapter {
	async fn delete(&self, id: &str) -> Result<(), String> {
		self.0.clean(id).await.map_err(|e| e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fs::CleanFs;
	use bigtts_model::{OutputFormat, Request};
	use bigtts_store::InMemoryStore;
	use chrono::Utc;
	use std::sync::Mutex;

	struct StubFs {
		removed: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl CleanFs for StubFs {
		async fn stale_top_level_dirs(&self, _root: &str, _cutoff: chrono::DateTime<Utc>) -> std::io::Result<Vec<String>> {
			Ok(vec![])
		}

		async fn remove_path(&self, path: &str) -> std::io::Result<()> {
			self.removed.lock().unwrap().push(path.to_string());
			Ok(())
		}
	}

	#[tokio::test]
	async fn clean_removes_store_rows_and_every_pattern() {
		let store = Arc::new(InMemoryStore::new());
		let req = Request {
			id: "id1".to_string(),
			voice: "astra".into(),
			speed: 1.0,
			output_format: OutputFormat::Mp3,
			save_request: false,
			save_tags: vec![],
			email: None,
			uploaded_filename: None,
			created_at: Utc::now(),
			request_id: None,
		};
		RequestStore::save(&*store, &req).await.unwrap();
		let fs = Arc::new(StubFs { removed: Mutex::new(vec![]) });

		let cleaner = Cleaner::new(store.clone(), store.clone(), store.clone(), fs.clone(), vec!["/upload/{ID}.txt".into(), "/split-out/{ID}".into()]);
		cleaner.clean("id1").await.unwrap();

		assert!(RequestStore::get(&*store, "id1").await.unwrap().is_none());
		let removed = fs.removed.lock().unwrap();
		assert_eq!(removed.as_slice(), ["/upload/id1.txt".to_string(), "/split-out/id1".to_string()]);
	}
}
