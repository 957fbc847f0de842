//! Directory-mode discovery (§4.7): top-level directories under a storage
//! root whose mtime is older than `expire`, plus recursive removal of the
//! `{ID}`-templated path patterns that represent one ID's filesystem
//! footprint. Both are injectable operation interfaces (§9 design note).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

#[async_trait]
pub trait CleanFs: Send + Sync {
	/// Top-level directory names under `root` whose mtime predates `cutoff`.
	async fn stale_top_level_dirs(&self, root: &str, cutoff: DateTime<Utc>) -> std::io::Result<Vec<String>>;
	/// Removes whatever exists at `path` (file or directory tree). A
	/// missing path is not an error — the pattern may simply not apply to
	/// every ID.
	async fn remove_path(&self, path: &str) -> std::io::Result<()>;
}

pub struct TokioFs;

#[async_trait]
impl CleanFs for TokioFs {
	async fn stale_top_level_dirs(&self, root: &str, cutoff: DateTime<Utc>) -> std::io::Result<Vec<String>> {
		let mut entries = tokio::fs::read_dir(root).await?;
		let mut stale = Vec::new();
		while let Some(entry) = entries.next_entry().await? {
			let metadata = entry.metadata().await?;
			if !metadata.is_dir() {
				continue;
			}
			let modified: DateTime<Utc> = metadata.modified()?.into();
			if modified < cutoff {
				if let Some(name) = entry.file_name().to_str() {
					stale.push(name.to_string());
				}
			}
		}
		Ok(stale)
	}

	async fn remove_path(&self, path: &str) -> std::io::Result<()> {
		let p = Path::new(path);
		let metadata = match tokio::fs::metadata(p).await {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
			Err(e) => return Err(e),
		};
		if metadata.is_dir() {
			tokio::fs::remove_dir_all(p).await
		} else {
			tokio::fs::remove_file(p).await
		}
	}
}
