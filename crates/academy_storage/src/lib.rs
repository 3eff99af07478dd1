use academy_core::{Error, Result, Storage};
use std::path::Path;

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATABASE_PATH: &str = "academy.db";

/// Builds the storage bundle for the backend named `kind` (`memory` or `sqlite`).
pub async fn create_storage(kind: &str, database: Option<&Path>) -> Result<Storage> {
    match kind {
        "memory" => {
            tracing::info!("💾 Using in-memory storage");
            Ok(MemoryStorage::create())
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = database.unwrap_or_else(|| Path::new(DEFAULT_DATABASE_PATH));
            let sqlite = SQLiteStorage::new_with_path(path).await?;
            Ok(sqlite.storage())
        }
        other => {
            let _ = database;
            Err(Error::Storage(format!("Unsupported storage backend: {}", other)))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::{ListQuery, Repository};

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage("memory", None).await.unwrap();
        let page = storage.notices.list(&ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        assert!(create_storage("qdrant", None).await.is_err());
    }
}
