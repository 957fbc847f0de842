use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::{InformType, JobMessage, Queue};
use bigtts_model::{Stage, Status};

/// Upload stage (§4.1 step 1): write `status=Uploaded`, send
/// `Inform(Started)`, publish to Split.
pub(crate) async fn run(coordinator: &Coordinator, msg: &JobMessage) -> Result<(), StageError> {
	coordinator.status_store.save(&Status::at_stage(&msg.id, Stage::Uploaded)).await?;
	coordinator.publish_inform(&msg.id, InformType::Started, &msg.save_tags).await?;
	coordinator.bus.publish_job(Queue::Split, msg).await?;
	Ok(())
}
