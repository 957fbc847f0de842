mod coordinator;
mod error;
mod retry;
mod stages;

pub use coordinator::{Coordinator, SHUTDOWN_DEADLINE};
pub use error::StageError;
