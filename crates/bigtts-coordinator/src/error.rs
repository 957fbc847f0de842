//! The shared error taxonomy (§7) applied to every stage handler's failure
//! mode. A `StageError` wraps whichever worker/store/queue error actually
//! occurred and answers exactly one question the retry policy needs:
//! which `ErrorClass` does this belong to.

use bigtts_model::ErrorClass;
use bigtts_queue::QueueError;
use bigtts_store::StoreError;
use bigtts_usage::UsageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("queue error: {0}")]
	Queue(#[from] QueueError),
	#[error(transparent)]
	Split(#[from] bigtts_splitter::WorkerError),
	#[error(transparent)]
	Synthesize(#[from] bigtts_synthesizer::WorkerError),
	#[error(transparent)]
	Join(#[from] bigtts_joiner::WorkerError),
	#[error(transparent)]
	Usage(#[from] UsageError),
	/// the external stop signal fired mid-handler; never classified, the
	/// caller suppresses nack/requeue entirely on this variant (§7 Shutdown).
	#[error("cancelled")]
	Cancelled,
}

impl StageError {
	/// Maps this failure onto the shared taxonomy (§7). `None` for
	/// `Cancelled` — callers must check for shutdown before classifying.
	#[must_use]
	pub fn classify(&self) -> Option<ErrorClass> {
		match self {
			Self::Store(_) | Self::Queue(_) => Some(ErrorClass::Transient),
			Self::Split(e) => Some(classify_split(e)),
			Self::Synthesize(e) => Some(classify_synthesize(e)),
			Self::Join(e) => Some(classify_join(e)),
			// an invalid requestID is the caller's own malformed job, never
			// retryable; anything else is a reachability blip worth one retry.
			Self::Usage(UsageError::InvalidRequestId(_)) => Some(ErrorClass::TerminalNonRestorable),
			Self::Usage(UsageError::Call(_)) => Some(ErrorClass::Transient),
			Self::Cancelled => None,
		}
	}
}

fn classify_split(e: &bigtts_splitter::WorkerError) -> ErrorClass {
	use bigtts_splitter::WorkerError as E;
	match e {
		E::Load(_) | E::CreateDir(_) | E::Save(_) => ErrorClass::Transient,
		// a boundary search failure or unparseable SSML means the caller fed
		// bad input; no amount of retrying fixes it.
		E::Split(_) | E::Ssml(_) => ErrorClass::TerminalNonRestorable,
	}
}

fn classify_synthesize(e: &bigtts_synthesizer::WorkerError) -> ErrorClass {
	use bigtts_synthesizer::WorkerError as E;
	match e {
		E::Io(_, _) => ErrorClass::Transient,
		E::Synthesize(inner) => bigtts_synthesizer::error_class(inner),
		E::Cancelled => ErrorClass::Transient,
	}
}

fn classify_join(e: &bigtts_joiner::WorkerError) -> ErrorClass {
	use bigtts_joiner::WorkerError as E;
	match e {
		E::CreateDir(_) | E::SaveList(_) => ErrorClass::Transient,
		// the concat tool itself failed; not the user's fault, usage should
		// be restored, but retrying won't help a broken ffmpeg invocation.
		E::Concat(_) => ErrorClass::TerminalRestorable,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn store_and_queue_errors_are_transient() {
		assert_eq!(StageError::from(StoreError::NotFound).classify(), Some(ErrorClass::Transient));
		assert_eq!(StageError::from(QueueError::Closed).classify(), Some(ErrorClass::Transient));
	}

	#[test]
	fn cancelled_has_no_classification() {
		assert_eq!(StageError::Cancelled.classify(), None);
	}

	#[test]
	fn usage_invalid_request_id_is_non_restorable() {
		let e = StageError::from(UsageError::InvalidRequestId("bad".into()));
		assert_eq!(e.classify(), Some(ErrorClass::TerminalNonRestorable));
	}
}
