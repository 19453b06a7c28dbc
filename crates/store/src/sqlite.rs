//! SQLite backend.
//!
//! One database file holds the assistant's own tables:
//! - `conversations` and `messages`: the append-only conversation log
//! - `users`: the tenant/role directory
//! - `knowledge_chunks`: document chunks with embedding blobs
//!
//! Business relations (campaign overview, WIP, transaction trends, ...) are
//! ordinary tables or views in the same file and are read through
//! [`RecordSource`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, info};
use workroom_core::error::StoreError;
use workroom_core::history::ConversationStore;
use workroom_core::identity::{UserDirectory, UserProfile};
use workroom_core::knowledge::{KnowledgeChunk, KnowledgeQuery, KnowledgeStore, ScoredChunk};
use workroom_core::message::{Conversation, ConversationId, MessageRecord, Role};
use workroom_core::records::{RecordQuery, RecordSource};

use crate::filter::{Dialect, render_select};
use crate::vector;

/// A SQLite store implementing every storage trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    ///
    /// Accepts `sqlite://path/to/file.db` or a bare path.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        if let Some(parent) = file_parent(url) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("Failed to create {parent}: {e}")))?;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// An ephemeral in-process database (single connection, so every query
    /// sees the same data).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// The underlying pool, for seeding business relations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 6] = [
            (
                "conversations table",
                r#"
                CREATE TABLE IF NOT EXISTS conversations (
                    id          TEXT PRIMARY KEY,
                    assistant   TEXT NOT NULL,
                    tenant_id   TEXT NOT NULL,
                    user_id     TEXT NOT NULL,
                    title       TEXT,
                    created_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "messages table",
                r#"
                CREATE TABLE IF NOT EXISTS messages (
                    iid             INTEGER PRIMARY KEY AUTOINCREMENT,
                    id              TEXT UNIQUE NOT NULL,
                    conversation_id TEXT NOT NULL REFERENCES conversations(id),
                    role            TEXT NOT NULL,
                    content         TEXT NOT NULL,
                    sources         TEXT,
                    tool_calls      TEXT,
                    created_at      TEXT NOT NULL
                )
                "#,
            ),
            (
                "messages index",
                "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, iid)",
            ),
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id          TEXT PRIMARY KEY,
                    tenant_id   TEXT NOT NULL,
                    role        TEXT NOT NULL
                )
                "#,
            ),
            (
                "knowledge_chunks table",
                r#"
                CREATE TABLE IF NOT EXISTS knowledge_chunks (
                    chunk_id        TEXT PRIMARY KEY,
                    namespace       TEXT NOT NULL,
                    tenant_id       TEXT NOT NULL,
                    document_id     TEXT NOT NULL,
                    document_title  TEXT NOT NULL,
                    chunk_text      TEXT NOT NULL,
                    category        TEXT,
                    roles           TEXT NOT NULL DEFAULT '[]',
                    metadata        TEXT NOT NULL DEFAULT '{}',
                    embedding       BLOB NOT NULL
                )
                "#,
            ),
            (
                "knowledge index",
                "CREATE INDEX IF NOT EXISTS idx_chunks_scope ON knowledge_chunks(namespace, tenant_id)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }
}

/// Directory that must exist for a file-backed URL.
fn file_parent(url: &str) -> Option<&str> {
    if url.contains(":memory:") {
        return None;
    }
    let path = url.strip_prefix("sqlite://").unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    let parent = std::path::Path::new(path).parent()?.to_str()?;
    (!parent.is_empty()).then_some(parent)
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn row_to_conversation(row: &SqliteRow) -> Result<Conversation, StoreError> {
    let id: String = column(row, "id")?;
    let created_at: String = column(row, "created_at")?;
    Ok(Conversation {
        id: ConversationId(id),
        assistant: column(row, "assistant")?,
        tenant_id: column(row, "tenant_id")?,
        user_id: column(row, "user_id")?,
        title: column(row, "title")?,
        created_at: parse_time(&created_at),
    })
}

fn row_to_message(row: &SqliteRow) -> Result<MessageRecord, StoreError> {
    let role: String = column(row, "role")?;
    let sources: Option<String> = column(row, "sources")?;
    let tool_calls: Option<String> = column(row, "tool_calls")?;
    let conversation_id: String = column(row, "conversation_id")?;
    let created_at: String = column(row, "created_at")?;

    Ok(MessageRecord {
        id: column(row, "id")?,
        conversation_id: ConversationId(conversation_id),
        role: Role::parse(&role)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown message role '{role}'")))?,
        content: column(row, "content")?,
        sources: sources
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| StoreError::QueryFailed(format!("sources column: {e}")))?
            .unwrap_or_default(),
        tool_calls: tool_calls
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| StoreError::QueryFailed(format!("tool_calls column: {e}")))?
            .unwrap_or_default(),
        created_at: parse_time(&created_at),
    })
}

fn row_to_chunk(row: &SqliteRow) -> Result<KnowledgeChunk, StoreError> {
    let roles: String = column(row, "roles")?;
    let metadata: String = column(row, "metadata")?;
    let embedding: Vec<u8> = column(row, "embedding")?;
    Ok(KnowledgeChunk {
        chunk_id: column(row, "chunk_id")?,
        namespace: column(row, "namespace")?,
        tenant_id: column(row, "tenant_id")?,
        document_id: column(row, "document_id")?,
        document_title: column(row, "document_title")?,
        chunk_text: column(row, "chunk_text")?,
        category: column(row, "category")?,
        roles: serde_json::from_str(&roles).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
        embedding: vector::from_blob(&embedding),
    })
}

/// Serialize an audit array, storing NULL when empty.
fn json_or_null<T: serde::Serialize>(items: &[T]) -> Result<Option<String>, StoreError> {
    if items.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(items)
        .map(Some)
        .map_err(|e| StoreError::Storage(format!("serialize: {e}")))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Convert an arbitrary row into a JSON object using each value's storage class.
fn row_to_json(row: &SqliteRow) -> Result<Value, StoreError> {
    let mut object = serde_json::Map::new();
    for col in row.columns() {
        let i = col.ordinal();
        let raw = row
            .try_get_raw(i)
            .map_err(|e| StoreError::QueryFailed(format!("{}: {e}", col.name())))?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            let decoded = match type_name.as_str() {
                "INTEGER" | "INT" | "BIGINT" | "INT8" | "BOOLEAN" => {
                    row.try_get::<i64, _>(i).map(Value::from)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(i).map(Value::from),
                "BLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(|b| Value::from(format!("<{} bytes>", b.len()))),
                _ => row.try_get::<String, _>(i).map(Value::from),
            };
            decoded
                .or_else(|_| row.try_get::<i64, _>(i).map(Value::from))
                .or_else(|_| row.try_get::<f64, _>(i).map(Value::from))
                .or_else(|_| row.try_get::<String, _>(i).map(Value::from))
                .map_err(|e| StoreError::QueryFailed(format!("{}: {e}", col.name())))?
        };
        object.insert(col.name().to_string(), value);
    }
    Ok(Value::Object(object))
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (id, assistant, tenant_id, user_id, title, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.as_str())
        .bind(&conversation.assistant)
        .bind(&conversation.tenant_id)
        .bind(&conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to create conversation: {e}")))?;

        debug!(id = %conversation.id, "Created conversation");
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT id, assistant, tenant_id, user_id, title, created_at \
             FROM conversations WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get conversation: {e}")))?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, sources, tool_calls, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(message.conversation_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(json_or_null(&message.sources)?)
        .bind(json_or_null(&message.tool_calls)?)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to append message: {e}")))?;

        debug!(conversation = %message.conversation_id, role = message.role.as_str(), "Appended message");
        Ok(())
    }

    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM ( \
                 SELECT iid, id, conversation_id, role, content, sources, tool_calls, created_at \
                 FROM messages WHERE conversation_id = ? ORDER BY iid DESC LIMIT ? \
             ) ORDER BY iid ASC",
        )
        .bind(id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to load history: {e}")))?;

        rows.iter().map(row_to_message).collect()
    }

    async fn count_conversations(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM conversations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count conversations: {e}")))?;
        let count: i64 = column(&row, "cnt")?;
        Ok(count as usize)
    }

    async fn count_messages(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count messages: {e}")))?;
        let count: i64 = column(&row, "cnt")?;
        Ok(count as usize)
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT id, tenant_id, role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to look up user: {e}")))?;

        row.map(|r| {
            Ok(UserProfile {
                user_id: column(&r, "id")?,
                tenant_id: column(&r, "tenant_id")?,
                role: column(&r, "role")?,
            })
        })
        .transpose()
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, tenant_id, role) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET tenant_id = excluded.tenant_id, role = excluded.role",
        )
        .bind(&profile.user_id)
        .bind(&profile.tenant_id)
        .bind(&profile.role)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to store user: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn search(&self, query: &KnowledgeQuery) -> Result<Vec<ScoredChunk>, StoreError> {
        // Scope in SQL, rank in Rust.
        let rows = match &query.category {
            Some(category) => {
                sqlx::query(
                    "SELECT * FROM knowledge_chunks \
                     WHERE namespace = ? AND tenant_id = ? AND category = ?",
                )
                .bind(&query.namespace)
                .bind(&query.tenant_id)
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM knowledge_chunks WHERE namespace = ? AND tenant_id = ?")
                    .bind(&query.namespace)
                    .bind(&query.tenant_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::QueryFailed(format!("Knowledge search failed: {e}")))?;

        let chunks = rows
            .iter()
            .map(row_to_chunk)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            namespace = %query.namespace,
            candidates = chunks.len(),
            "Ranking knowledge chunks"
        );
        Ok(vector::rank_chunks(chunks.iter(), query))
    }

    async fn index_chunk(&self, chunk: KnowledgeChunk) -> Result<(), StoreError> {
        let roles = serde_json::to_string(&chunk.roles)
            .map_err(|e| StoreError::Storage(format!("serialize roles: {e}")))?;
        sqlx::query(
            "INSERT OR REPLACE INTO knowledge_chunks \
             (chunk_id, namespace, tenant_id, document_id, document_title, chunk_text, \
              category, roles, metadata, embedding) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.namespace)
        .bind(&chunk.tenant_id)
        .bind(&chunk.document_id)
        .bind(&chunk.document_title)
        .bind(&chunk.chunk_text)
        .bind(&chunk.category)
        .bind(roles)
        .bind(chunk.metadata.to_string())
        .bind(vector::to_blob(&chunk.embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to index chunk: {e}")))?;
        Ok(())
    }

    async fn count_chunks(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM knowledge_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count chunks: {e}")))?;
        let count: i64 = column(&row, "cnt")?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RecordSource for SqliteStore {
    async fn select(&self, query: &RecordQuery) -> Result<Vec<Value>, StoreError> {
        let rendered = render_select(query, Dialect::Sqlite)?;
        debug!(sql = %rendered.sql, "Record query");

        let mut q = sqlx::query(&rendered.sql);
        for param in &rendered.params {
            q = bind_value(q, param);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{}: {e}", query.relation)))?;

        rows.iter().map(row_to_json).collect()
    }
}
