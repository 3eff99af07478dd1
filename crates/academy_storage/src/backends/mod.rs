pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{MemoryRepository, MemoryStorage};

#[cfg(feature = "sqlite")]
pub use sqlite::{SQLiteStorage, SqliteRepository};
