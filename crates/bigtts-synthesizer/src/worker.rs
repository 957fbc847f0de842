//! Bounded-parallel synthesis driver (§4.3): a semaphore of size
//! `workerCount` bounds in-flight remote calls; the driver stops issuing
//! new tasks on the first error, drains what's outstanding, and returns the
//! first observed error (or a cancellation error on external shutdown).

use crate::client::{SynthesizeClient, SynthesizeError, SynthesizeRequest};
use async_trait::async_trait;
use bigtts_messages::JobMessage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum WorkerError {
	#[error("can't read chunk {0}: {1}")]
	Io(PathBuf, std::io::Error),
	#[error(transparent)]
	Synthesize(#[from] SynthesizeError),
	#[error("cancelled")]
	Cancelled,
}

#[async_trait]
pub trait ChunkFs: Send + Sync {
	async fn exists(&self, path: &Path) -> bool;
	async fn read_chunk(&self, path: &Path) -> std::io::Result<String>;
	async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()>;
	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;
}

struct TokioChunkFs;

#[async_trait]
impl ChunkFs for TokioChunkFs {
	async fn exists(&self, path: &Path) -> bool {
		tokio::fs::metadata(path).await.is_ok()
	}

	async fn read_chunk(&self, path: &Path) -> std::io::Result<String> {
		tokio::fs::read_to_string(path).await
	}

	async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
		let tmp = path.with_extension("tmp");
		tokio::fs::write(&tmp, data).await?;
		tokio::fs::rename(&tmp, path).await
	}

	async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
		tokio::fs::create_dir_all(path).await
	}
}

pub struct Worker {
	client: Arc<dyn SynthesizeClient>,
	fs: Arc<dyn ChunkFs>,
	in_template: String,
	out_template: String,
	worker_count: usize,
}

impl Worker {
	#[must_use]
	pub fn new(client: Arc<dyn SynthesizeClient>, in_template: String, out_template: String, worker_count: usize) -> Self {
		Self { client, fs: Arc::new(TokioChunkFs), in_template, out_template, worker_count }
	}

	#[must_use]
	pub fn with_fs(client: Arc<dyn SynthesizeClient>, fs: Arc<dyn ChunkFs>, in_template: String, out_template: String, worker_count: usize) -> Self {
		Self { client, fs, in_template, out_template, worker_count }
	}

	/// Ensures every `NNNN.txt` input chunk has a matching `NNNN.<fmt>`
	/// output, skipping chunks already produced (crash-restart idempotence,
	/// §8 invariant 4).
	///
	/// # Errors
	/// Returns the first error observed across the bounded fan-out, or
	/// `WorkerError::Cancelled` if `stop` fires mid-run.
	pub async fn synthesize(&self, job: &JobMessage, stop: &CancellationToken) -> Result<(), WorkerError> {
		tracing::info!(id = %job.id, workers = self.worker_count, "doing synthesize job");

		let in_dir = self.in_template.replace("{}", &job.id);
		let out_dir = self.out_template.replace("{}", &job.id);
		self.fs.create_dir_all(Path::new(&out_dir)).await.map_err(|e| WorkerError::Io(out_dir.clone().into(), e))?;

		let semaphore = Arc::new(Semaphore::new(self.worker_count));
		let (err_tx, mut err_rx) = mpsc::channel::<WorkerError>(self.worker_count + 1);
		let stopped = Arc::new(AtomicBool::new(false));
		let mut handles = Vec::new();

		let mut index = 0usize;
		loop {
			let in_path = PathBuf::from(format!("{in_dir}/{index:04}.txt"));
			if !self.fs.exists(&in_path).await {
				break;
			}
			if stop.is_cancelled() || stopped.load(Ordering::Acquire) {
				break;
			}

			let permit = tokio::select! {
				biased;
				() = stop.cancelled() => break,
				permit = Arc::clone(&semaphore).acquire_owned() => permit.expect("semaphore never closed"),
			};

			let out_path = PathBuf::from(format!("{out_dir}/{index:04}.{}", job.output_format));
			let client = Arc::clone(&self.client);
			let fs = Arc::clone(&self.fs);
			let err_tx = err_tx.clone();
			let stopped = Arc::clone(&stopped);
			let job = job.clone();
			let stop = stop.clone();

			handles.push(tokio::spawn(async move {
				let _permit = permit;
				if fs.exists(&out_path).await {
					tracing::info!(id = %job.id, index, "chunk already present, skipping");
					return;
				}
				let result = run_one(&*client, &*fs, &in_path, &out_path, &job, &stop).await;
				if let Err(e) = result {
					stopped.store(true, Ordering::Release);
					let _ = err_tx.send(e).await;
				}
			}));

			index += 1;
		}
		drop(err_tx);

		for handle in handles {
			let _ = handle.await;
		}

		if stop.is_cancelled() {
			return Err(WorkerError::Cancelled);
		}
		if let Some(err) = err_rx.recv().await {
			return Err(err);
		}
		tracing::info!(id = %job.id, chunks = index, "synthesize complete");
		Ok(())
	}
}

async fn run_one(client: &dyn SynthesizeClient, fs: &dyn ChunkFs, in_path: &Path, out_path: &Path, job: &JobMessage, stop: &CancellationToken) -> Result<(), WorkerError> {
	let text = fs.read_chunk(in_path).await.map_err(|e| WorkerError::Io(in_path.to_path_buf(), e))?;
	let req = SynthesizeRequest { text: &text, output_format: &job.output_format, voice: &job.voice, speed: job.speed, save_request: job.save_request, save_tags: &job.save_tags };

	let audio = tokio::select! {
		biased;
		() = stop.cancelled() => return Err(WorkerError::Cancelled),
		result = client.synthesize(&req) => result?,
	};

	fs.write_atomic(out_path, &audio).await.map_err(|e| WorkerError::Io(out_path.to_path_buf(), e))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::sync::atomic::AtomicUsize;
	use std::sync::Mutex;

	struct MemChunkFs {
		chunks: HashMap<String, String>,
		outputs: Mutex<HashMap<String, Vec<u8>>>,
	}

	#[async_trait]
	impl ChunkFs for MemChunkFs {
		async fn exists(&self, path: &Path) -> bool {
			let key = path.to_str().unwrap();
			self.chunks.contains_key(key) || self.outputs.lock().unwrap().contains_key(key)
		}

		async fn read_chunk(&self, path: &Path) -> std::io::Result<String> {
			self.chunks.get(path.to_str().unwrap()).cloned().ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
		}

		async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
			self.outputs.lock().unwrap().insert(path.to_str().unwrap().to_string(), data.to_vec());
			Ok(())
		}

		async fn create_dir_all(&self, _path: &Path) -> std::io::Result<()> {
			Ok(())
		}
	}

	struct StubClient {
		calls: AtomicUsize,
		fail_on: Option<usize>,
	}

	#[async_trait]
	impl SynthesizeClient for StubClient {
		async fn synthesize(&self, _req: &SynthesizeRequest<'_>) -> Result<Vec<u8>, SynthesizeError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail_on == Some(n) {
				return Err(SynthesizeError::Retryable("boom".into()));
			}
			Ok(vec![1, 2, 3])
		}
	}

	fn job() -> JobMessage {
		JobMessage { id: "req1".into(), voice: "astra".into(), speed: 1.0, save_request: false, output_format: "mp3".into(), save_tags: vec![], request_id: None, error: None }
	}

	#[tokio::test]
	async fn synthesizes_every_chunk_and_skips_existing() {
		let chunks = HashMap::from([("/split/req1/0000.txt".to_string(), "hello".to_string()), ("/split/req1/0001.txt".to_string(), "world".to_string())]);
		let fs = Arc::new(MemChunkFs { chunks, outputs: Mutex::new(HashMap::from([("/synth/req1/0001.mp3".to_string(), vec![9])])) });
		let client = Arc::new(StubClient { calls: AtomicUsize::new(0), fail_on: None });
		let worker = Worker::with_fs(client.clone(), fs.clone(), "/split/{}".into(), "/synth/{}".into(), 2);

		worker.synthesize(&job(), &CancellationToken::new()).await.unwrap();

		let outputs = fs.outputs.lock().unwrap();
		assert_eq!(outputs.get("/synth/req1/0000.mp3"), Some(&vec![1, 2, 3]));
		assert_eq!(outputs.get("/synth/req1/0001.mp3"), Some(&vec![9])); // untouched, was already present
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn first_error_is_returned_after_drain() {
		let chunks = HashMap::from([
			("/split/req1/0000.txt".to_string(), "a".to_string()),
			("/split/req1/0001.txt".to_string(), "b".to_string()),
			("/split/req1/0002.txt".to_string(), "c".to_string()),
		]);
		let fs = Arc::new(MemChunkFs { chunks, outputs: Mutex::new(HashMap::new()) });
		let client = Arc::new(StubClient { calls: AtomicUsize::new(0), fail_on: Some(1) });
		let worker = Worker::with_fs(client, fs, "/split/{}".into(), "/synth/{}".into(), 1);

		let err = worker.synthesize(&job(), &CancellationToken::new()).await.unwrap_err();
		assert!(matches!(err, WorkerError::Synthesize(SynthesizeError::Retryable(_))));
	}

	#[tokio::test]
	async fn cancellation_stops_the_driver() {
		let chunks = HashMap::from([("/split/req1/0000.txt".to_string(), "a".to_string())]);
		let fs = Arc::new(MemChunkFs { chunks, outputs: Mutex::new(HashMap::new()) });
		let client = Arc::new(StubClient { calls: AtomicUsize::new(0), fail_on: None });
		let worker = Worker::with_fs(client, fs, "/split/{}".into(), "/synth/{}".into(), 1);

		let stop = CancellationToken::new();
		stop.cancel();
		let err = worker.synthesize(&job(), &stop).await.unwrap_err();
		assert!(matches!(err, WorkerError::Cancelled));
	}
}
