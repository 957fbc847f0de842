use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::JobMessage;

/// Fail stage (§4.1 step 5, usage restore): no status/inform side effect,
/// purely a call out to the Usage Restorer.
pub(crate) async fn run(coordinator: &Coordinator, msg: &JobMessage) -> Result<(), StageError> {
	let request_id = msg.request_id.as_deref().unwrap_or_default();
	let error = msg.error.as_deref().unwrap_or_default();
	coordinator.usage_restorer.restore(request_id, error).await?;
	Ok(())
}
