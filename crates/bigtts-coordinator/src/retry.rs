//! The retry policy (§4.1, §7): `requeue = redeliverable AND NOT
//! alreadyRedelivered`. On a terminal failure, write the error to Status,
//! emit Inform(Failed), and — when the cause is restorable, this message
//! didn't arrive on Fail already, and the job doesn't already carry an
//! error — publish a Fail job for usage restoration. Redeliverable and
//! restorable are independent axes: a `Transient` failure that has
//! exhausted its one retry is terminal but still restorable, since nothing
//! about it was the caller's fault (§8 concrete scenario 7).

use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::{InformType, JobMessage, Queue};
use bigtts_model::Status;

/// Cancellation is handled by the caller before this is reached; any other
/// error without a classification is treated as non-redeliverable, since an
/// unclassified failure is the one case the taxonomy doesn't expect.
#[must_use]
pub(crate) fn should_requeue(err: &StageError, redelivered: bool) -> bool {
	let redeliverable = err.classify().is_some_and(bigtts_model::ErrorClass::is_redeliverable);
	redeliverable && !redelivered
}

pub(crate) async fn handle_terminal_failure(coordinator: &Coordinator, queue: Queue, msg: &JobMessage, err: &StageError) {
	tracing::error!(id = %msg.id, queue = queue.name(), error = %err, "job failed terminally");

	if let Err(e) = coordinator.status_store.save(&Status::failed(&msg.id, err.to_string())).await {
		tracing::error!(id = %msg.id, error = %e, "failed to persist terminal error status");
	}
	if let Err(e) = coordinator.publish_inform(&msg.id, InformType::Failed, &msg.save_tags).await {
		tracing::error!(id = %msg.id, error = %e, "failed to publish Inform(Failed)");
	}

	let restorable = err.classify().is_some_and(bigtts_model::ErrorClass::is_restorable);
	if restorable && queue != Queue::Fail && msg.error.is_none() {
		let fail_job = msg.with_error(err.to_string());
		if let Err(e) = coordinator.bus.publish_job(Queue::Fail, &fail_job).await {
			tracing::error!(id = %msg.id, error = %e, "failed to publish Fail job");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bigtts_model::ErrorClass;
	use bigtts_queue::{InMemoryBus, MessageBus};
	use bigtts_store::{InMemoryStore, StoreError};
	use bigtts_synthesizer::{SynthesizeClient, SynthesizeError, SynthesizeRequest};
	use bigtts_usage::UsageError;
	use std::sync::Arc;

	#[test]
	fn transient_first_delivery_requeues() {
		let err = StageError::from(StoreError::NotFound);
		assert_eq!(err.classify(), Some(ErrorClass::Transient));
		assert!(should_requeue(&err, false));
	}

	#[test]
	fn transient_redelivered_is_terminal() {
		let err = StageError::from(StoreError::NotFound);
		assert!(!should_requeue(&err, true));
	}

	#[test]
	fn non_restorable_never_requeues_even_on_first_delivery() {
		let err = StageError::from(UsageError::InvalidRequestId("x".into()));
		assert!(!should_requeue(&err, false));
	}

	struct NeverCalledSynthesizeClient;

	#[async_trait]
	impl SynthesizeClient for NeverCalledSynthesizeClient {
		async fn synthesize(&self, _req: &SynthesizeRequest<'_>) -> Result<Vec<u8>, SynthesizeError> {
			unreachable!("handle_terminal_failure never invokes the synthesize worker")
		}
	}

	fn job(id: &str) -> JobMessage {
		JobMessage { id: id.to_string(), voice: "astra".into(), speed: 1.0, save_request: false, output_format: "mp3".into(), save_tags: vec![], request_id: Some("svc:manual:opaque".into()), error: None }
	}

	fn test_coordinator(bus: Arc<dyn MessageBus>, store: Arc<InMemoryStore>) -> Coordinator {
		let splitter = Arc::new(bigtts_splitter::Worker::new("/in/{}.txt".into(), "/out/{}".into()));
		let synthesizer = Arc::new(bigtts_synthesizer::Worker::new(Arc::new(NeverCalledSynthesizeClient), "/split/{}".into(), "/synth/{}".into(), 1));
		let joiner = Arc::new(bigtts_joiner::Worker::new("/synth/{}".into(), "/join/{}".into(), "/work/{}".into(), vec![]));
		let usage_restorer = Arc::new(bigtts_usage::HttpUsageRestorer::new("http://localhost:1".into()));
		Coordinator::new(bus, store, splitter, synthesizer, joiner, usage_restorer)
	}

	/// §8 concrete scenario 7: a remote 503 classifies `Transient`; on the
	/// second delivery `should_requeue` goes terminal, but the failure is
	/// still restorable (everything except remote-4xx is), so a Fail job
	/// carrying the populated error and the original `requestID` must be
	/// published.
	#[tokio::test]
	async fn exhausted_transient_failure_still_publishes_a_fail_job() {
		let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
		let store = Arc::new(InMemoryStore::new());
		let coordinator = test_coordinator(Arc::clone(&bus), store);

		let err = StageError::from(bigtts_synthesizer::WorkerError::from(SynthesizeError::Retryable("503 service unavailable".into())));
		assert_eq!(err.classify(), Some(ErrorClass::Transient));
		assert!(!should_requeue(&err, true), "second delivery of a transient failure must be terminal");

		let msg = job("req-1");
		handle_terminal_failure(&coordinator, Queue::Synthesize, &msg, &err).await;

		let delivery = bus.consume_job(Queue::Fail, 0.0).await.unwrap().expect("expected a Fail job");
		assert_eq!(delivery.msg.id, "req-1");
		assert_eq!(delivery.msg.request_id.as_deref(), Some("svc:manual:opaque"));
		assert!(delivery.msg.error.is_some());
	}

	#[test]
	fn non_restorable_is_the_only_class_excluded_from_restore() {
		let err = StageError::from(UsageError::InvalidRequestId("x".into()));
		assert!(!err.classify().is_some_and(ErrorClass::is_restorable));
	}
}
