//! Periodic sweep (§4.7): every `timer.runEvery`, discover IDs older than
//! `timer.expire` — DB mode queries the Request store, directory mode
//! scans `fileStorage.path` by mtime — and runs the same full `Cleaner`
//! purge on each. Observes a stop context the way every other blocking
//! loop in this workspace does (§9 design note).

use crate::cleaner::Cleaner;
use crate::fs::CleanFs;
use bigtts_config::CleanerMode;
use bigtts_store::RequestStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Sweeper {
	mode: CleanerMode,
	cleaner: Arc<Cleaner>,
	request_store: Arc<dyn RequestStore>,
	fs: Arc<dyn CleanFs>,
	storage_root: String,
	run_every: Duration,
	expire: Duration,
}

impl Sweeper {
	#[must_use]
	pub fn new(mode: CleanerMode, cleaner: Arc<Cleaner>, request_store: Arc<dyn RequestStore>, fs: Arc<dyn CleanFs>, storage_root: String, run_every: Duration, expire: Duration) -> Self {
		Self { mode, cleaner, request_store, fs, storage_root, run_every, expire }
	}

	/// Runs one discovery-and-purge pass, returning the number of IDs
	/// cleaned.
	///
	/// # Errors
	/// Returns the first store or filesystem error encountered; IDs
	/// already processed in this pass stay deleted (no rollback).
	pub async fn sweep_once(&self) -> Result<usize, crate::cleaner::CleanError> {
		let cutoff = Utc::now() - ChronoDuration::from_std(self.expire).unwrap_or(ChronoDuration::zero());
		let ids = match self.mode {
			CleanerMode::Db => self.request_store.ids_older_than(cutoff).await?,
			CleanerMode::Dir => self.fs.stale_top_level_dirs(&self.storage_root, cutoff).await.map_err(|e| crate::cleaner::CleanError::Fs(self.storage_root.clone(), e))?,
		};
		for id in &ids {
			self.cleaner.clean(id).await?;
		}
		tracing::info!(mode = ?self.mode, count = ids.len(), "cleaner sweep complete");
		Ok(ids.len())
	}

	/// Runs `sweep_once` on `run_every` until `stop` fires.
	pub async fn run(&self, stop: &CancellationToken) {
		loop {
			tokio::select! {
				biased;
				() = stop.cancelled() => {
					tracing::info!("cleaner sweep loop stopping");
					return;
				}
				() = tokio::time::sleep(self.run_every) => {
					if let Err(e) = self.sweep_once().await {
						tracing::error!(error = %e, "cleaner sweep failed");
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cleaner::Cleaner;
	use async_trait::async_trait;
	use bigtts_model::{OutputFormat, Request};
	use bigtts_store::{EmailLockStore, InMemoryStore, StatusStore};

	struct NoFs;
	#[async_trait]
	impl CleanFs for NoFs {
		async fn stale_top_level_dirs(&self, _root: &str, _cutoff: chrono::DateTime<Utc>) -> std::io::Result<Vec<String>> {
			Ok(vec![])
		}

		async fn remove_path(&self, _path: &str) -> std::io::Result<()> {
			Ok(())
		}
	}

	fn req(id: &str, age_days: i64) -> Request {
		Request {
			id: id.to_string(),
			voice: "astra".into(),
			speed: 1.0,
			output_format: OutputFormat::Mp3,
			save_request: false,
			save_tags: vec![],
			email: None,
			uploaded_filename: None,
			created_at: Utc::now() - ChronoDuration::days(age_days),
			request_id: None,
		}
	}

	#[tokio::test]
	async fn db_mode_sweep_removes_only_stale_rows() {
		let store = Arc::new(InMemoryStore::new());
		RequestStore::save(&*store, &req("old", 10)).await.unwrap();
		RequestStore::save(&*store, &req("new", 0)).await.unwrap();

		let cleaner = Arc::new(Cleaner::new(store.clone(), store.clone(), store.clone(), Arc::new(NoFs), vec![]));
		let sweeper = Sweeper::new(CleanerMode::Db, cleaner, store.clone(), Arc::new(NoFs), String::new(), Duration::from_secs(1), Duration::from_secs(86_400));

		let cleaned = sweeper.sweep_once().await.unwrap();
		assert_eq!(cleaned, 1);
		assert!(RequestStore::get(&*store, "old").await.unwrap().is_none());
		assert!(RequestStore::get(&*store, "new").await.unwrap().is_some());
	}
}
