pub mod error;
pub mod models;
pub mod repo;

mod memory;
pub use memory::MemoryStore;

pub use error::{StoreError, StoreResult};
pub use models::*;
pub use repo::Store;
