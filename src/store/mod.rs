//! Persistence of the index artifact and its advisory lock

pub mod lock;
pub mod persist;

pub use lock::IndexLock;
pub use persist::IndexStore;
