//! The Pipeline Coordinator (§4.1): five cooperative consumer loops, one per
//! queue, each running the matching stage handler and applying the shared
//! retry policy on failure.

use crate::error::StageError;
use crate::retry;
use bigtts_messages::{InformMessage, InformType, JobMessage, Queue};
use bigtts_queue::MessageBus;
use bigtts_store::StatusStore;
use bigtts_usage::UsageRestorer;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long `consume_job` blocks per poll before the loop re-checks the stop
/// signal. Not a spec constant — an implementation detail of the consumer
/// loop's responsiveness to shutdown.
const POLL_INTERVAL_SECS: f64 = 1.0;

/// Hard deadline the service waits for all five consumer loops to drain on
/// shutdown before exiting regardless (§5).
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(15);

const STAGE_QUEUES: [Queue; 5] = [Queue::Upload, Queue::Split, Queue::Synthesize, Queue::Join, Queue::Fail];

pub struct Coordinator {
	pub(crate) bus: Arc<dyn MessageBus>,
	pub(crate) status_store: Arc<dyn StatusStore>,
	pub(crate) splitter: Arc<bigtts_splitter::Worker>,
	pub(crate) synthesizer: Arc<bigtts_synthesizer::Worker>,
	pub(crate) joiner: Arc<bigtts_joiner::Worker>,
	pub(crate) usage_restorer: Arc<dyn UsageRestorer>,
}

impl Coordinator {
	#[must_use]
	pub fn new(bus: Arc<dyn MessageBus>, status_store: Arc<dyn StatusStore>, splitter: Arc<bigtts_splitter::Worker>, synthesizer: Arc<bigtts_synthesizer::Worker>, joiner: Arc<bigtts_joiner::Worker>, usage_restorer: Arc<dyn UsageRestorer>) -> Self {
		Self { bus, status_store, splitter, synthesizer, joiner, usage_restorer }
	}

	/// Runs the five consumer loops until `stop` is cancelled, then waits up
	/// to `SHUTDOWN_DEADLINE` for them to drain before returning regardless.
	pub async fn run(self: Arc<Self>, stop: CancellationToken) {
		let mut tasks = JoinSet::new();
		for queue in STAGE_QUEUES {
			let this = Arc::clone(&self);
			let stop = stop.clone();
			tasks.spawn(async move { this.run_queue(queue, stop).await });
		}

		stop.cancelled().await;
		tracing::info!(deadline = ?SHUTDOWN_DEADLINE, "coordinator stopping, draining consumer loops");

		let drain = async {
			while tasks.join_next().await.is_some() {}
		};
		if tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await.is_err() {
			tracing::warn!("shutdown deadline elapsed, aborting remaining consumer loops");
			tasks.abort_all();
		}
	}

	async fn run_queue(&self, queue: Queue, stop: CancellationToken) {
		tracing::info!(queue = queue.name(), "consumer loop started");
		loop {
			if stop.is_cancelled() {
				break;
			}
			match self.bus.consume_job(queue, POLL_INTERVAL_SECS).await {
				Ok(Some(delivery)) => self.handle_delivery(queue, delivery, &stop).await,
				Ok(None) => continue,
				Err(e) => {
					tracing::error!(queue = queue.name(), error = %e, "failed to poll queue");
					tokio::time::sleep(Duration::from_millis(500)).await;
				}
			}
		}
		tracing::info!(queue = queue.name(), "consumer loop stopped");
	}

	async fn handle_delivery(&self, queue: Queue, delivery: bigtts_queue::JobDelivery, stop: &CancellationToken) {
		let msg = delivery.msg.clone();
		let redelivered = delivery.redelivered;

		let result = self.dispatch(queue, &msg, stop).await;

		let Err(err) = result else {
			if let Err(e) = self.bus.ack_job(delivery).await {
				tracing::error!(id = %msg.id, queue = queue.name(), error = %e, "ack failed");
			}
			return;
		};

		if stop.is_cancelled() {
			// shutdown in progress: suppress nack/requeue entirely and rely
			// on redelivery after restart (§7 Shutdown).
			return;
		}

		let requeue = retry::should_requeue(&err, redelivered);
		if !requeue {
			retry::handle_terminal_failure(self, queue, &msg, &err).await;
		}

		if let Err(e) = self.bus.nack_job(queue, delivery, requeue).await {
			tracing::error!(id = %msg.id, queue = queue.name(), error = %e, "nack failed");
		}
	}

	async fn dispatch(&self, queue: Queue, msg: &JobMessage, stop: &CancellationToken) -> Result<(), StageError> {
		match queue {
			Queue::Upload => crate::stages::upload(self, msg).await,
			Queue::Split => crate::stages::split(self, msg).await,
			Queue::Synthesize => crate::stages::synthesize(self, msg, stop).await,
			Queue::Join => crate::stages::join(self, msg).await,
			Queue::Fail => crate::stages::fail(self, msg).await,
			Queue::Inform => unreachable!("coordinator never consumes Inform, that's the inform worker's queue"),
		}
	}

	/// Emits an Inform Message carrying the job's own `saveTags` (§3: the
	/// original propagates `SaveTags` onto outbound inform messages).
	pub(crate) async fn publish_inform(&self, id: &str, kind: InformType, tags: &[String]) -> Result<(), StageError> {
		let msg = InformMessage { id: id.to_string(), kind, at: chrono::Utc::now(), tags: tags.to_vec() };
		self.bus.publish_inform(&msg).await?;
		Ok(())
	}
}
