//! The message bus contract (§6 Queues) and its two implementations: a
//! Redis-backed reliable queue for production, an in-memory one for tests.

mod bus;
mod delivery;
mod error;
mod memory_bus;
mod redis_bus;

pub use bus::MessageBus;
pub use delivery::{InformDelivery, JobDelivery};
pub use error::QueueError;
pub use memory_bus::InMemoryBus;
pub use redis_bus::RedisBus;
