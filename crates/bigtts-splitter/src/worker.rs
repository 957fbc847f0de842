//! The Splitter Worker (§4.2): loads `<upload>/{}.txt`, picks the plain-text
//! or SSML algorithm based on content, and writes `NNNN.txt`/`NNNN.xml`
//! chunk files under the split directory.
//!
//! File load/save/directory-create are injectable operation interfaces
//! (§9 design note) so tests can substitute in-memory stand-ins instead of
//! touching the filesystem.

use crate::ssml::{split_ssml, SsmlError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
	#[error("can't load text: {0}")]
	Load(std::io::Error),
	#[error("can't create directory: {0}")]
	CreateDir(std::io::Error),
	#[error("can't save chunk: {0}")]
	Save(std::io::Error),
	#[error("can't split text: {0}")]
	Split(#[from] crate::plaintext::SplitError),
	#[error("can't split ssml: {0}")]
	Ssml(#[from] SsmlError),
}

#[async_trait]
pub trait FileLoader: Send + Sync {
	async fn load(&self, path: &Path) -> std::io::Result<String>;
}

#[async_trait]
pub trait FileSaver: Send + Sync {
	async fn save(&self, path: &Path, data: &str) -> std::io::Result<()>;
}

#[async_trait]
pub trait DirCreator: Send + Sync {
	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;
}

struct TokioFs;

#[async_trait]
impl FileLoader for TokioFs {
	async fn load(&self, path: &Path) -> std::io::Result<String> {
		tokio::fs::read_to_string(path).await
	}
}

#[async_trait]
impl FileSaver for TokioFs {
	async fn save(&self, path: &Path, data: &str) -> std::io::Result<()> {
		tokio::fs::write(path, data).await
	}
}

#[async_trait]
impl DirCreator for TokioFs {
	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
		tokio::fs::create_dir_all(path).await
	}
}

pub struct Worker {
	in_template: String,
	out_template: String,
	loader: Arc<dyn FileLoader>,
	saver: Arc<dyn FileSaver>,
	dir_creator: Arc<dyn DirCreator>,
}

impl Worker {
	/// Builds a worker backed directly by `tokio::fs`.
	///
	/// # Panics
	/// Never (templates are validated by `bigtts_config::Config::validate_templates`
	/// before a worker is constructed).
	#[must_use]
	pub fn new(in_template: String, out_template: String) -> Self {
		Self { in_template, out_template, loader: Arc::new(TokioFs), saver: Arc::new(TokioFs), dir_creator: Arc::new(TokioFs) }
	}

	#[must_use]
	pub fn with_ops(in_template: String, out_template: String, loader: Arc<dyn FileLoader>, saver: Arc<dyn FileSaver>, dir_creator: Arc<dyn DirCreator>) -> Self {
		Self { in_template, out_template, loader, saver, dir_creator }
	}

	/// Splits the uploaded text for `id` and writes its chunk files.
	///
	/// # Errors
	/// Returns `WorkerError` on missing input, unparseable SSML, I/O
	/// failure, or a boundary-search failure from the split algorithm.
	pub async fn split(&self, id: &str) -> Result<(), WorkerError> {
		tracing::info!(id, "doing split job");
		let in_path = self.in_template.replace("{}", id);
		let text = self.loader.load(Path::new(&in_path)).await.map_err(WorkerError::Load)?;

		// chunk files are always `.txt` (§3 data model), whether their content
		// is plain prose or a serialized `<speak>` document
		let chunks = if is_ssml(&text) { split_ssml(&text)? } else { crate::plaintext::split_plain_text(&text)? };

		let out_dir = self.out_template.replace("{}", id);
		self.dir_creator.create_dir_all(Path::new(&out_dir)).await.map_err(WorkerError::CreateDir)?;
		for (i, chunk) in chunks.iter().enumerate() {
			let path = format!("{out_dir}/{i:04}.txt");
			self.saver.save(Path::new(&path), chunk).await.map_err(WorkerError::Save)?;
		}
		tracing::info!(id, chunks = chunks.len(), "split complete");
		Ok(())
	}
}

fn is_ssml(text: &str) -> bool {
	text.trim_start().starts_with("<speak")
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::sync::Mutex;

	struct MemFs {
		files: Mutex<HashMap<String, String>>,
	}

	#[async_trait]
	impl FileLoader for MemFs {
		async fn load(&self, path: &Path) -> std::io::Result<String> {
			self.files.lock().unwrap().get(path.to_str().unwrap()).cloned().ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
		}
	}

	#[async_trait]
	impl FileSaver for MemFs {
		async fn save(&self, path: &Path, data: &str) -> std::io::Result<()> {
			self.files.lock().unwrap().insert(path.to_str().unwrap().to_string(), data.to_string());
			Ok(())
		}
	}

	#[async_trait]
	impl DirCreator for MemFs {
		async fn create_dir_all(&self, _path: &Path) -> std::io::Result<()> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn split_writes_dense_chunk_files() {
		let fs = Arc::new(MemFs { files: Mutex::new(HashMap::from([("/upload/req1.txt".to_string(), "hello world. this is fine.".to_string())])) });
		let worker = Worker::with_ops("/upload/{}.txt".into(), "/split-out/{}".into(), fs.clone(), fs.clone(), fs.clone());
		worker.split("req1").await.unwrap();
		let files = fs.files.lock().unwrap();
		assert!(files.contains_key("/split-out/req1/0000.txt"));
	}

	#[tokio::test]
	async fn split_missing_input_is_an_error() {
		let fs = Arc::new(MemFs { files: Mutex::new(HashMap::new()) });
		let worker = Worker::with_ops("/upload/{}.txt".into(), "/split-out/{}".into(), fs.clone(), fs.clone(), fs.clone());
		assert!(worker.split("missing").await.is_err());
	}

	#[tokio::test]
	async fn split_detects_ssml_and_still_writes_txt_chunks() {
		let fs = Arc::new(MemFs { files: Mutex::new(HashMap::from([("/upload/req1.txt".to_string(), r#"<speak><voice name="astra">hi there</voice></speak>"#.to_string())])) });
		let worker = Worker::with_ops("/upload/{}.txt".into(), "/split-out/{}".into(), fs.clone(), fs.clone(), fs.clone());
		worker.split("req1").await.unwrap();
		let files = fs.files.lock().unwrap();
		let chunk = files.get("/split-out/req1/0000.txt").expect("ssml chunk still named .txt per data model");
		assert!(chunk.starts_with("<speak>"));
	}
}
