//! Mirrors `joiner.Worker` from the original service: a dense-prefix file
//! scan builds the concat list, then an external tool invocation produces
//! the final audio. File existence/IO and the tool invocation are
//! injectable operation interfaces (§9 design note) so tests never touch
//! the filesystem or spawn a real process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
	#[error("can't create directory: {0}")]
	CreateDir(std::io::Error),
	#[error("can't save list file: {0}")]
	SaveList(std::io::Error),
	#[error("concat tool failed: {0}")]
	Concat(String),
}

#[async_trait]
pub trait ChunkFs: Send + Sync {
	async fn exists(&self, path: &Path) -> bool;
	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;
	async fn write(&self, path: &Path, data: &str) -> std::io::Result<()>;
}

struct TokioChunkFs;

#[async_trait]
impl ChunkFs for TokioChunkFs {
	async fn exists(&self, path: &Path) -> bool {
		tokio::fs::metadata(path).await.is_ok()
	}

	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
		tokio::fs::create_dir_all(path).await
	}

	async fn write(&self, path: &Path, data: &str) -> std::io::Result<()> {
		tokio::fs::write(path, data).await
	}
}

/// Invokes the external audio container concat tool (§4.4, typically
/// `ffmpeg`). Returns the tool's combined stdout+stderr verbatim on
/// failure, per spec.
#[async_trait]
pub trait ConcatTool: Send + Sync {
	async fn run(&self, args: &[String]) -> Result<(), String>;
}

/// Shells out to `ffmpeg` via `tokio::process::Command`, combining stdout
/// and stderr into the error message on a non-zero exit.
pub struct FfmpegTool {
	program: String,
}

impl FfmpegTool {
	#[must_use]
	pub fn new() -> Self {
		Self { program: "ffmpeg".to_string() }
	}
}

impl Default for FfmpegTool {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ConcatTool for FfmpegTool {
	async fn run(&self, args: &[String]) -> Result<(), String> {
		let output = tokio::process::Command::new(&self.program).args(args).output().await.map_err(|e| e.to_string())?;
		if output.status.success() {
			return Ok(());
		}
		let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
		combined.push_str(&String::from_utf8_lossy(&output.stderr));
		Err(combined)
	}
}

pub struct Worker {
	synth_out_template: String,
	join_out_template: String,
	work_template: String,
	metadata: Vec<(String, String)>,
	fs: std::sync::Arc<dyn ChunkFs>,
	tool: std::sync::Arc<dyn ConcatTool>,
}

impl Worker {
	#[must_use]
	pub fn new(synth_out_template: String, join_out_template: String, work_template: String, metadata: Vec<(String, String)>) -> Self {
		Self { synth_out_template, join_out_template, work_template, metadata, fs: std::sync::Arc::new(TokioChunkFs), tool: std::sync::Arc::new(FfmpegTool::new()) }
	}

	#[must_use]
	pub fn with_ops(
		synth_out_template: String,
		join_out_template: String,
		work_template: String,
		metadata: Vec<(String, String)>,
		fs: std::sync::Arc<dyn ChunkFs>,
		tool: std::sync::Arc<dyn ConcatTool>,
	) -> Self {
		Self { synth_out_template, join_out_template, work_template, metadata, fs, tool }
	}

	/// Produces `<joinOut>/{}/result.<fmt>` from the dense prefix of present
	/// synthesis chunks.
	///
	/// # Errors
	/// Returns `WorkerError` on a directory/list-file I/O failure or a
	/// non-zero concat tool exit.
	pub async fn join(&self, id: &str, output_format: &str) -> Result<(), WorkerError> {
		tracing::info!(id, "doing join job");

		let synth_dir = self.synth_out_template.replace("{}", id);
		let files = self.list_dense_chunks(&synth_dir, output_format).await;

		let work_dir = self.work_template.replace("{}", id);
		self.fs.create_dir_all(Path::new(&work_dir)).await.map_err(WorkerError::CreateDir)?;
		let list_path = PathBuf::from(&work_dir).join("list.txt");
		self.fs.write(&list_path, &prepare_list_file(&files)).await.map_err(WorkerError::SaveList)?;

		let join_dir = self.join_out_template.replace("{}", id);
		self.fs.create_dir_all(Path::new(&join_dir)).await.map_err(WorkerError::CreateDir)?;
		let result_path = PathBuf::from(&join_dir).join(format!("result.{output_format}"));

		let args = self.concat_args(&list_path, &result_path);
		self.tool.run(&args).await.map_err(WorkerError::Concat)?;

		tracing::info!(id, chunks = files.len(), "join complete");
		Ok(())
	}

	async fn list_dense_chunks(&self, synth_dir: &str, output_format: &str) -> Vec<String> {
		let mut files = Vec::new();
		for index in 0.. {
			let path = format!("{synth_dir}/{index:04}.{output_format}");
			if !self.fs.exists(Path::new(&path)).await {
				break;
			}
			files.push(path);
		}
		files
	}

	fn concat_args(&self, list_path: &Path, result_path: &Path) -> Vec<String> {
		let mut args = vec!["-f".to_string(), "concat".to_string(), "-safe".to_string(), "0".to_string(), "-i".to_string(), list_path.display().to_string(), "-c".to_string(), "copy".to_string()];
		for (k, v) in &self.metadata {
			args.push("-metadata".to_string());
			args.push(format!("{k}={v}"));
		}
		args.push(result_path.display().to_string());
		args
	}
}

fn prepare_list_file(files: &[String]) -> String {
	let mut out = String::new();
	for f in files {
		out.push_str("file '");
		out.push_str(f);
		out.push_str("'\n");
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::sync::Mutex;

	struct MemFs {
		existing: Vec<String>,
		written: Mutex<HashMap<String, String>>,
	}

	#[async_trait]
	impl ChunkFs for MemFs {
		async fn exists(&self, path: &Path) -> bool {
			self.existing.iter().any(|p| p == path.to_str().unwrap())
		}

		async fn create_dir_all(&self, _path: &Path) -> std::io::Result<()> {
			Ok(())
		}

		async fn write(&self, path: &Path, data: &str) -> std::io::Result<()> {
			self.written.lock().unwrap().insert(path.to_str().unwrap().to_string(), data.to_string());
			Ok(())
		}
	}

	struct StubTool {
		captured: Mutex<Vec<Vec<String>>>,
		fail: bool,
	}

	#[async_trait]
	impl ConcatTool for StubTool {
		async fn run(&self, args: &[String]) -> Result<(), String> {
			self.captured.lock().unwrap().push(args.to_vec());
			if self.fail {
				return Err("ffmpeg stderr: boom".to_string());
			}
			Ok(())
		}
	}

	#[tokio::test]
	async fn join_stops_at_first_gap() {
		let fs = std::sync::Arc::new(MemFs {
			existing: vec!["/synth/id1/0000.mp3".to_string(), "/synth/id1/0001.mp3".to_string(), "/synth/id1/0003.mp3".to_string()],
			written: Mutex::new(HashMap::new()),
		});
		let tool = std::sync::Arc::new(StubTool { captured: Mutex::new(Vec::new()), fail: false });
		let worker = Worker::with_ops("/synth/{}".into(), "/join/{}".into(), "/work/{}".into(), vec![], fs.clone(), tool.clone());

		worker.join("id1", "mp3").await.unwrap();

		let written = fs.written.lock().unwrap();
		let list = written.get("/work/id1/list.txt").unwrap();
		assert_eq!(list, "file '/synth/id1/0000.mp3'\nfile '/synth/id1/0001.mp3'\n");
	}

	#[tokio::test]
	async fn join_passes_metadata_and_result_path() {
		let fs = std::sync::Arc::new(MemFs { existing: vec!["/synth/id1/0000.mp3".to_string()], written: Mutex::new(HashMap::new()) });
		let tool = std::sync::Arc::new(StubTool { captured: Mutex::new(Vec::new()), fail: false });
		let worker = Worker::with_ops("/synth/{}".into(), "/join/{}".into(), "/work/{}".into(), vec![("title".to_string(), "My Book".to_string())], fs, tool.clone());

		worker.join("id1", "mp3").await.unwrap();

		let calls = tool.captured.lock().unwrap();
		let args = &calls[0];
		assert!(args.contains(&"-metadata".to_string()));
		assert!(args.contains(&"title=My Book".to_string()));
		assert_eq!(args.last().unwrap(), "/join/id1/result.mp3");
	}

	#[tokio::test]
	async fn join_propagates_tool_failure_verbatim() {
		let fs = std::sync::Arc::new(MemFs { existing: vec!["/synth/id1/0000.mp3".to_string()], written: Mutex::new(HashMap::new()) });
		let tool = std::sync::Arc::new(StubTool { captured: Mutex::new(Vec::new()), fail: true });
		let worker = Worker::with_ops("/synth/{}".into(), "/join/{}".into(), "/work/{}".into(), vec![], fs, tool);

		let err = worker.join("id1", "mp3").await.unwrap_err();
		assert!(matches!(err, WorkerError::Concat(msg) if msg.contains("boom")));
	}

	#[tokio::test]
	async fn join_with_no_chunks_writes_empty_list() {
		let fs = std::sync::Arc::new(MemFs { existing: vec![], written: Mutex::new(HashMap::new()) });
		let tool = std::sync::Arc::new(StubTool { captured: Mutex::new(Vec::new()), fail: false });
		let worker = Worker::with_ops("/synth/{}".into(), "/join/{}".into(), "/work/{}".into(), vec![], fs.clone(), tool);

		worker.join("id1", "mp3").await.unwrap();
		let written = fs.written.lock().unwrap();
		assert_eq!(written.get("/work/id1/list.txt").unwrap(), "");
	}
}
