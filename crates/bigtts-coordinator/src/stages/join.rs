use crate::coordinator::Coordinator;
use crate::error::StageError;
use bigtts_messages::{InformType, JobMessage};
use bigtts_model::{Stage, Status};

/// Join stage (§4.1 step 4): write `status=Join`, run the Joiner, write
/// `status=Completed`, send `Inform(Finished)`.
pub(crate) async fn run(coordinator: &Coordinator, msg: &JobMessage) -> Result<(), StageError> {
	coordinator.status_store.save(&Status::at_stage(&msg.id, Stage::Join)).await?;
	coordinator.joiner.join(&msg.id, &msg.output_format).await?;
	coordinator.status_store.save(&Status::at_stage(&msg.id, Stage::Completed)).await?;
	coordinator.publish_inform(&msg.id, InformType::Finished, &msg.save_tags).await?;
	Ok(())
}
