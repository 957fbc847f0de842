mod cleaner;
mod fs;
mod sweeper;

pub use cleaner::{CleanError, Cleaner, DeleteHandlerAdapter};
pub use fs::{CleanFs, TokioFs};
pub use sweeper::Sweeper;
