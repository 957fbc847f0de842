use crate::bus::MessageBus;
use crate::delivery::{InformDelivery, JobDelivery, Token};
use crate::error::QueueError;
use async_trait::async_trait;
use bigtts_messages::{InformMessage, JobMessage, Queue};
use redis::{Client, Commands, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Envelope stored on the wire so a redelivered message can be told apart
/// from a first delivery without a separate lookup (§4.1 "alreadyRedelivered").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
	payload: T,
	redelivered: bool,
}

fn processing_key(queue_name: &str) -> String {
	format!("{queue_name}:processing")
}

/// Redis list based reliable queue, built on the `BRPOPLPUSH` main-queue ->
/// processing-list pattern: a consumer atomically moves a message into its
/// own processing list, does the work, then either `LREM`s it (ack) or
/// pushes a redelivered copy back onto the main queue (nack+requeue).
/// Generalizes `task_queue::redis_queue::RedisScheduler`'s "sync
/// `Connection` behind a `tokio::Mutex`" shape to two named message types.
#[derive(Clone)]
pub struct RedisBus {
	conn: Arc<Mutex<Connection>>,
}

impl RedisBus {
	/// # Errors
	/// Returns an error if the Redis connection cannot be established.
	pub fn new(redis_url: &str) -> Result<Self, QueueError> {
		let client = Client::open(redis_url)?;
		let conn = client.get_connection()?;
		Ok(Self { conn: Arc::new(Mutex::new(conn)) })
	}

	async fn publish<T: Serialize + Clone>(&self, queue_name: &str, payload: &T, redelivered: bool) -> Result<(), QueueError> {
		let envelope = Envelope { payload: payload.clone(), redelivered };
		let serialized = serde_json::to_string(&envelope)?;
		let mut conn = self.conn.lock().await;
		let _: () = conn.lpush(queue_name, serialized)?;
		Ok(())
	}

	async fn consume<T: DeserializeOwned>(&self, queue_name: &str, timeout_secs: f64) -> Result<Option<(T, bool, String)>, QueueError> {
		let mut conn = self.conn.lock().await;
		let raw: Option<String> = redis::cmd("BRPOPLPUSH")
			.arg(queue_name)
			.arg(processing_key(queue_name))
			.arg(timeout_secs)
			.query(&mut *conn)?;
		drop(conn);
		let Some(raw) = raw else { return Ok(None) };
		let envelope: Envelope<T> = serde_json::from_str(&raw)?;
		Ok(Some((envelope.payload, envelope.redelivered, raw)))
	}

	async fn ack(&self, queue_name: &str, raw: &str) -> Result<(), QueueError> {
		let mut conn = self.conn.lock().await;
		let _: () = conn.lrem(processing_key(queue_name), 1, raw)?;
		Ok(())
	}

	async fn nack<T: Serialize + DeserializeOwned>(&self, queue_name: &str, raw: &str, requeue: bool) -> Result<(), QueueError> {
		let mut conn = self.conn.lock().await;
		let _: () = conn.lrem(processing_key(queue_name), 1, raw)?;
		if requeue {
			let envelope: Envelope<T> = serde_json::from_str(raw)?;
			let redelivered = Envelope { payload: envelope.payload, redelivered: true };
			let serialized = serde_json::to_string(&redelivered)?;
			let _: () = conn.lpush(queue_name, serialized)?;
		}
		Ok(())
	}
}

#[async_trait]
impl MessageBus for RedisBus {
	async fn publish_job(&self, queue: Queue, msg: &JobMessage) -> Result<(), QueueError> {
		self.publish(&queue.queue_name(), msg, false).await
	}

	async fn consume_job(&self, queue: Queue, timeout_secs: f64) -> Result<Option<JobDelivery>, QueueError> {
		let name = queue.queue_name();
		let Some((msg, redelivered, raw)) = self.consume::<JobMessage>(&name, timeout_secs).await? else {
			return Ok(None);
		};
		Ok(Some(JobDelivery { msg, redelivered, token: Token::Redis { raw } }))
	}

	async fn ack_job(&self, delivery: JobDelivery) -> Result<(), QueueError> {
		let Token::Redis { raw } = delivery.token else { return Ok(()) };
		// the queue name isn't carried on the token; acks are keyed purely
		// by the processing-list entry, which is unique per in-flight item
		self.ack_any(&raw).await
	}

	async fn nack_job(&self, queue: Queue, delivery: JobDelivery, requeue: bool) -> Result<(), QueueError> {
		let Token::Redis { raw } = delivery.token else { return Ok(()) };
		self.nack::<JobMessage>(&queue.queue_name(), &raw, requeue).await
	}

	async fn publish_inform(&self, msg: &InformMessage) -> Result<(), QueueError> {
		self.publish(&Queue::Inform.queue_name(), msg, false).await
	}

	async fn consume_inform(&self, timeout_secs: f64) -> Result<Option<InformDelivery>, QueueError> {
		let name = Queue::Inform.queue_name();
		let Some((msg, redelivered, raw)) = self.consume::<InformMessage>(&name, timeout_secs).await? else {
			return Ok(None);
		};
		Ok(Some(InformDelivery { msg, redelivered, token: Token::Redis { raw } }))
	}

	async fn ack_inform(&self, delivery: InformDelivery) -> Result<(), QueueError> {
		let Token::Redis { raw } = delivery.token else { return Ok(()) };
		self.ack_any(&raw).await
	}

	async fn nack_inform(&self, delivery: InformDelivery, requeue: bool) -> Result<(), QueueError> {
		let Token::Redis { raw } = delivery.token else { return Ok(()) };
		self.nack::<InformMessage>(&Queue::Inform.queue_name(), &raw, requeue).await
	}
}

impl RedisBus {
	/// Acks by removing `raw` from whichever processing list currently
	/// holds it. Each queue gets its own processing list, but the payload
	/// is unique per delivery so scanning the handful of known lists is
	/// cheap and avoids threading the queue name through the token.
	async fn ack_any(&self, raw: &str) -> Result<(), QueueError> {
		let mut conn = self.conn.lock().await;
		for q in [Queue::Upload, Queue::Split, Queue::Synthesize, Queue::Join, Queue::Fail, Queue::Inform] {
			let removed: i32 = conn.lrem(processing_key(&q.queue_name()), 1, raw)?;
			if removed > 0 {
				return Ok(());
			}
		}
		Ok(())
	}
}
