pub mod error;
mod memory;
mod redis_store;
mod traits;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redis_store::RedisStore;
pub use traits::{EmailLockStore, RequestStore, StatusStore};
