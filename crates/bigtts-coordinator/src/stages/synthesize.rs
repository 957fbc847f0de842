use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::{JobMessage, Queue};
use bigtts_model::{Stage, Status};
use tokio_util::sync::CancellationToken;

/// Synthesize stage (§4.1 step 3): write `status=Synthesize`, run the
/// bounded-parallel Synthesizer, publish to Join.
pub(crate) async fn run(coordinator: &Coordinator, msg: &JobMessage, stop: &CancellationToken) -> Result<(), StageError> {
	coordinator.status_store.save(&Status::at_stage(&msg.id, Stage::Synthesize)).await?;
	coordinator.synthesizer.synthesize(msg, stop).await?;
	coordinator.bus.publish_job(Queue::Join, msg).await?;
	Ok(())
}
