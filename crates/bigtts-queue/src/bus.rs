use crate::delivery::{InformDelivery, JobDelivery};
use crate::error::QueueError;
use async_trait::async_trait;
use bigtts_messages::{InformMessage, JobMessage, Queue};

/// The message-bus contract the coordinator, splitter/synthesizer/joiner
/// dispatch, and the inform worker consume: QoS=1 style — one in-flight
/// delivery per consumer per queue, explicit ack/nack with a requeue flag.
///
/// The concrete broker is named only by contract in the spec (§6); this
/// crate ships a Redis-backed reliable-queue implementation (generalizing
/// `task_queue::redis_queue::RedisScheduler`) and an in-memory one for
/// tests.
#[async_trait]
pub trait MessageBus: Send + Sync {
	async fn publish_job(&self, queue: Queue, msg: &JobMessage) -> Result<(), QueueError>;

	/// Blocks up to `timeout_secs` waiting for a Job Message on `queue`.
	/// `Ok(None)` means the wait timed out with nothing available.
	async fn consume_job(&self, queue: Queue, timeout_secs: f64) -> Result<Option<JobDelivery>, QueueError>;

	async fn ack_job(&self, delivery: JobDelivery) -> Result<(), QueueError>;

	/// `requeue = true` re-publishes the message onto the same queue marked
	/// redelivered; `requeue = false` drops it (terminal).
	async fn nack_job(&self, queue: Queue, delivery: JobDelivery, requeue: bool) -> Result<(), QueueError>;

	async fn publish_inform(&self, msg: &InformMessage) -> Result<(), QueueError>;

	async fn consume_inform(&self, timeout_secs: f64) -> Result<Option<InformDelivery>, QueueError>;

	async fn ack_inform(&self, delivery: InformDelivery) -> Result<(), QueueError>;

	async fn nack_inform(&self, delivery: InformDelivery, requeue: bool) -> Result<(), QueueError>;
}
