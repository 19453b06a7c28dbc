//! Storage backends for Workroom.
//!
//! Each backend implements all four storage seams from `workroom-core`:
//! the conversation log, the user directory, the knowledge base and the
//! read-only record source the domain tools query.

pub mod filter;
pub mod in_memory;
pub mod retriever;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;
use tracing::info;
use workroom_config::DatabaseConfig;
use workroom_core::error::StoreError;
use workroom_core::history::ConversationStore;
use workroom_core::identity::UserDirectory;
use workroom_core::knowledge::KnowledgeStore;
use workroom_core::records::RecordSource;

pub use in_memory::InMemoryStore;
pub use retriever::{KnowledgeRetriever, RetrievalScope};
pub use vector::cosine_similarity;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// The storage handles shared by the orchestrator, tools and gateway.
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn ConversationStore>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub users: Arc<dyn UserDirectory>,
    pub records: Arc<dyn RecordSource>,
}

impl Stores {
    /// Use one backend for every seam.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ConversationStore + KnowledgeStore + UserDirectory + RecordSource + 'static,
    {
        Self {
            conversations: backend.clone(),
            knowledge: backend.clone(),
            users: backend.clone(),
            records: backend,
        }
    }
}

/// Open the backend named in `config`.
///
/// SQLite creates its schema on connect. PostgreSQL only connects; its
/// schema is applied by [`migrate`].
pub async fn open(config: &DatabaseConfig) -> Result<Stores, StoreError> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory store");
            Ok(Stores::from_backend(Arc::new(InMemoryStore::new())))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let store = SqliteStore::connect(&config.resolved_url(), config.max_connections).await?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let store =
                PostgresStore::connect(&config.resolved_url(), config.max_connections).await?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        other => Err(StoreError::Storage(format!(
            "Storage backend '{other}' is not available in this build"
        ))),
    }
}

/// Apply the schema for the configured backend. Idempotent.
pub async fn migrate(config: &DatabaseConfig) -> Result<(), StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(()),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            // connect() already runs the schema statements.
            SqliteStore::connect(&config.resolved_url(), 1).await?;
            Ok(())
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            PostgresStore::connect(&config.resolved_url(), 1)
                .await?
                .migrate()
                .await
        }
        other => Err(StoreError::Storage(format!(
            "Storage backend '{other}' is not available in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str, url: Option<String>) -> DatabaseConfig {
        DatabaseConfig {
            backend: backend.into(),
            url,
            max_connections: 2,
        }
    }

    #[tokio::test]
    async fn open_memory_backend() {
        let stores = open(&config("memory", None)).await.unwrap();
        assert_eq!(stores.conversations.name(), "memory");
        assert_eq!(stores.knowledge.count_chunks().await.unwrap(), 0);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn open_sqlite_file_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/nested/workroom.db", dir.path().display());
        migrate(&config("sqlite", Some(url.clone()))).await.unwrap();
        let stores = open(&config("sqlite", Some(url))).await.unwrap();
        assert_eq!(stores.conversations.name(), "sqlite");
        assert_eq!(stores.conversations.count_conversations().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_backend_is_error() {
        assert!(open(&config("cassandra", None)).await.is_err());
    }
}
