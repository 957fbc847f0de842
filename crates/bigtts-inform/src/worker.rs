//! The Inform Worker's `work` function (§4.5), lock-first ordering: resolve
//! email, render, lock, send, then mark sent. A lock rejected because the
//! row is already in the `Sent` state means the message was already
//! delivered — that's a skip, not an error (§8 invariant 2).

use crate::template::EmailTemplater;
use crate::transport::{EmailSender, SendError};
use bigtts_messages::{InformMessage, InformType};
use bigtts_model::EmailLockState;
use bigtts_store::{EmailLockStore, RequestStore, StoreError};
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InformError {
	#[error("no email on file for {0}")]
	MissingEmail(String),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error(transparent)]
	Send(#[from] SendError),
}

impl InformError {
	/// Missing email is the job's own fault — not retryable. Every other
	/// failure (store hiccup, transport error) is transient.
	#[must_use]
	pub const fn is_redeliverable(&self) -> bool {
		!matches!(self, Self::MissingEmail(_))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Sent,
	/// lock already held in the `Sent` state — message already delivered.
	AlreadyDelivered,
}

fn lock_kind(kind: InformType) -> &'static str {
	kind.as_str()
}

pub struct Worker {
	request_store: Arc<dyn RequestStore>,
	lock_store: Arc<dyn EmailLockStore>,
	templater: Arc<dyn EmailTemplater>,
	sender: Arc<dyn EmailSender>,
	timezone: Tz,
}

impl Worker {
	#[must_use]
	pub fn new(request_store: Arc<dyn RequestStore>, lock_store: Arc<dyn EmailLockStore>, templater: Arc<dyn EmailTemplater>, sender: Arc<dyn EmailSender>, timezone: Tz) -> Self {
		Self { request_store, lock_store, templater, sender, timezone }
	}

	/// Processes one Inform Message.
	///
	/// # Errors
	/// Returns `InformError::MissingEmail` if the request has no email on
	/// file (non-retryable), or propagates a store/transport failure
	/// (retryable).
	pub async fn process(&self, msg: &InformMessage) -> Result<Outcome, InformError> {
		tracing::info!(id = %msg.id, kind = msg.kind.as_str(), "doing inform job");

		let email = self
			.request_store
			.get(&msg.id)
			.await?
			.and_then(|r| r.email)
			.ok_or_else(|| InformError::MissingEmail(msg.id.clone()))?;

		let local_time = msg.at.with_timezone(&self.timezone);
		let rendered = self.templater.render(&msg.id, msg.kind, local_time, &email);

		let kind = lock_kind(msg.kind);
		match self.lock_store.lock(&msg.id, kind).await {
			Ok(()) => {}
			Err(StoreError::AlreadySent) => {
				tracing::info!(id = %msg.id, kind, "already delivered, skipping");
				return Ok(Outcome::AlreadyDelivered);
			}
			Err(e) => return Err(e.into()),
		}

		match self.sender.send(&rendered).await {
			Ok(()) => {
				self.lock_store.unlock(&msg.id, kind, EmailLockState::Sent).await?;
				tracing::info!(id = %msg.id, kind, "email sent");
				Ok(Outcome::Sent)
			}
			Err(e) => {
				// leave the lock row at Acquired: the error path never marks
				// the message as delivered (§4.5 step 5).
				Err(e.into())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::template::RenderedEmail;
	use async_trait::async_trait;
	use bigtts_model::{OutputFormat, Request};
	use bigtts_store::InMemoryStore;
	use chrono::Utc;
	use std::sync::Mutex;

	struct StubTemplater;
	impl EmailTemplater for StubTemplater {
		fn render(&self, id: &str, _kind: InformType, _local_time: chrono::DateTime<Tz>, email: &str) -> RenderedEmail {
			RenderedEmail { to: email.to_string(), subject: format!("subject {id}"), body: "body".to_string() }
		}
	}

	struct StubSender {
		sent: Mutex<Vec<String>>,
		fail: bool,
	}

	#[async_trait]
	impl EmailSender for StubSender {
		async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
			if self.fail {
				return Err(SendError::Transport("boom".into()));
			}
			self.sent.lock().unwrap().push(email.to.clone());
			Ok(())
		}
	}

	fn req_with_email(id: &str, email: Option<&str>) -> Request {
		Request {
			id: id.to_string(),
			voice: "astra".into(),
			speed: 1.0,
			output_format: OutputFormat::Mp3,
			save_request: false,
			save_tags: vec![],
			email: email.map(str::to_string),
			uploaded_filename: None,
			created_at: Utc::now(),
			request_id: None,
		}
	}

	fn msg(id: &str, kind: InformType) -> InformMessage {
		InformMessage { id: id.to_string(), kind, at: Utc::now(), tags: vec![] }
	}

	#[tokio::test]
	async fn missing_email_is_non_retryable() {
		let store = Arc::new(InMemoryStore::new());
		RequestStore::save(&*store, &req_with_email("id1", None)).await.unwrap();
		let worker = Worker::new(store.clone(), store.clone(), Arc::new(StubTemplater), Arc::new(StubSender { sent: Mutex::new(vec![]), fail: false }), chrono_tz::UTC);

		let err = worker.process(&msg("id1", InformType::Started)).await.unwrap_err();
		assert!(matches!(err, InformError::MissingEmail(_)));
		assert!(!err.is_redeliverable());
	}

	#[tokio::test]
	async fn sends_and_marks_sent() {
		let store = Arc::new(InMemoryStore::new());
		RequestStore::save(&*store, &req_with_email("id1", Some("user@example.com"))).await.unwrap();
		let sender = Arc::new(StubSender { sent: Mutex::new(vec![]), fail: false });
		let worker = Worker::new(store.clone(), store.clone(), Arc::new(StubTemplater), sender.clone(), chrono_tz::UTC);

		let outcome = worker.process(&msg("id1", InformType::Finished)).await.unwrap();
		assert_eq!(outcome, Outcome::Sent);
		assert_eq!(sender.sent.lock().unwrap().as_slice(), ["user@example.com"]);

		// redelivery after a successful send is a no-op skip, never resent
		let outcome2 = worker.process(&msg("id1", InformType::Finished)).await.unwrap();
		assert_eq!(outcome2, Outcome::AlreadyDelivered);
		assert_eq!(sender.sent.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn failed_send_leaves_lock_acquired_so_a_retry_can_resend() {
		let store = Arc::new(InMemoryStore::new());
		RequestStore::save(&*store, &req_with_email("id1", Some("user@example.com"))).await.unwrap();
		let failing = Arc::new(StubSender { sent: Mutex::new(vec![]), fail: true });
		let worker = Worker::new(store.clone(), store.clone(), Arc::new(StubTemplater), failing, chrono_tz::UTC);

		assert!(worker.process(&msg("id1", InformType::Started)).await.is_err());

		let succeeding = Arc::new(StubSender { sent: Mutex::new(vec![]), fail: false });
		let retry_worker = Worker::new(store.clone(), store.clone(), Arc::new(StubTemplater), succeeding.clone(), chrono_tz::UTC);
		let outcome = retry_worker.process(&msg("id1", InformType::Started)).await.unwrap();
		assert_eq!(outcome, Outcome::Sent);
	}
}
