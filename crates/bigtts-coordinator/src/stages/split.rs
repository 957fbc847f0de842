use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::{JobMessage, Queue};
use bigtts_model::{Stage, Status};

/// Split stage (§4.1 step 2): write `status=Split`, run the Splitter,
/// publish to Synthesize.
pub(crate) async fn run(coordinator: &Coordinator, msg: &JobMessage) -> Result<(), StageError> {
	coordinator.status_store.save(&Status::at_stage(&msg.id, Stage::Split)).await?;
	coordinator.splitter.split(&msg.id).await?;
	coordinator.bus.publish_job(Queue::Synthesize, msg).await?;
	Ok(())
}
