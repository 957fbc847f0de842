use crate::bus::MessageBus;
use crate::delivery::{InformDelivery, JobDelivery, Token};
use crate::error::QueueError;
use async_trait::async_trait;
use bigtts_messages::{InformMessage, JobMessage, Queue};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::Mutex;

struct Envelope<T> {
	payload: T,
	redelivered: bool,
}

/// Single-process bus for tests and the integration suite: one `VecDeque`
/// per named queue, FIFO, no broker round-trip. `ack` is a no-op since the
/// item is already removed from the deque on consume; `nack(requeue=true)`
/// pushes it back marked redelivered.
#[derive(Default)]
pub struct InMemoryBus {
	jobs: Mutex<HashMap<&'static str, VecDeque<Envelope<JobMessage>>>>,
	inform: Mutex<VecDeque<Envelope<InformMessage>>>,
	notify: Notify,
}

impl InMemoryBus {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	async fn wait_a_moment(timeout_secs: f64) {
		tokio::time::sleep(Duration::from_secs_f64(timeout_secs.min(0.05))).await;
	}
}

#[async_trait]
impl MessageBus for InMemoryBus {
	async fn publish_job(&self, queue: Queue, msg: &JobMessage) -> Result<(), QueueError> {
		self.jobs
			.lock()
			.await
			.entry(queue.name())
			.or_default()
			.push_back(Envelope { payload: msg.clone(), redelivered: false });
		self.notify.notify_waiters();
		Ok(())
	}

	async fn consume_job(&self, queue: Queue, timeout_secs: f64) -> Result<Option<JobDelivery>, QueueError> {
		let popped = self.jobs.lock().await.get_mut(queue.name()).and_then(VecDeque::pop_front);
		let Some(envelope) = popped else {
			Self::wait_a_moment(timeout_secs).await;
			return Ok(None);
		};
		Ok(Some(JobDelivery { msg: envelope.payload, redelivered: envelope.redelivered, token: Token::Memory }))
	}

	async fn ack_job(&self, _delivery: JobDelivery) -> Result<(), QueueError> {
		Ok(())
	}

	async fn nack_job(&self, queue: Queue, delivery: JobDelivery, requeue: bool) -> Result<(), QueueError> {
		if requeue {
			self.jobs
				.lock()
				.await
				.entry(queue.name())
				.or_default()
				.push_front(Envelope { payload: delivery.msg, redelivered: true });
			self.notify.notify_waiters();
		}
		Ok(())
	}

	async fn publish_inform(&self, msg: &InformMessage) -> Result<(), QueueError> {
		self.inform.lock().await.push_back(Envelope { payload: msg.clone(), redelivered: false });
		self.notify.notify_waiters();
		Ok(())
	}

	async fn consume_inform(&self, timeout_secs: f64) -> Result<Option<InformDelivery>, QueueError> {
		let popped = self.inform.lock().await.pop_front();
		let Some(envelope) = popped else {
			Self::wait_a_moment(timeout_secs).await;
			return Ok(None);
		};
		Ok(Some(InformDelivery { msg: envelope.payload, redelivered: envelope.redelivered, token: Token::Memory }))
	}

	async fn ack_inform(&self, _delivery: InformDelivery) -> Result<(), QueueError> {
		Ok(())
	}

	async fn nack_inform(&self, delivery: InformDelivery, requeue: bool) -> Result<(), QueueError> {
		if requeue {
			self.inform.lock().await.push_front(Envelope { payload: delivery.msg, redelivered: true });
			self.notify.notify_waiters();
		}
		Ok(())
	}
}
