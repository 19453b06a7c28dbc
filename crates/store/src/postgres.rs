//! PostgreSQL + pgvector backend.
//!
//! Same tables as the SQLite backend, with `JSONB` audit columns, a
//! `TEXT[]` role list and a pgvector `embedding` column ranked in SQL with
//! the `<=>` cosine-distance operator.
//!
//! # Setup
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! ```
//!
//! Then run `workroom migrate`, which applies `migrations/001_workroom.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::{debug, info};
use workroom_core::error::StoreError;
use workroom_core::history::ConversationStore;
use workroom_core::identity::{UserDirectory, UserProfile};
use workroom_core::knowledge::{KnowledgeChunk, KnowledgeQuery, KnowledgeStore, ScoredChunk};
use workroom_core::message::{Conversation, ConversationId, MessageRecord, Role};
use workroom_core::records::{RecordQuery, RecordSource};

use crate::filter::{Dialect, render_select};
use crate::vector;

/// A PostgreSQL store implementing every storage trait.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to `database_url`. Does not migrate.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the schema migration.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let migration_sql = include_str!("../migrations/001_workroom.sql");

        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Migration failed: {e}")))?;

        info!("Workroom schema migration complete");
        Ok(())
    }
}

fn column<T>(row: &PgRow, name: &str) -> Result<T, StoreError>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn json_column<T: serde::de::DeserializeOwned + Default>(
    row: &PgRow,
    name: &str,
) -> Result<T, StoreError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
        .map(Option::unwrap_or_default)
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

fn row_to_conversation(row: &PgRow) -> Result<Conversation, StoreError> {
    let id: String = column(row, "id")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    Ok(Conversation {
        id: ConversationId(id),
        assistant: column(row, "assistant")?,
        tenant_id: column(row, "tenant_id")?,
        user_id: column(row, "user_id")?,
        title: column(row, "title")?,
        created_at,
    })
}

fn row_to_message(row: &PgRow) -> Result<MessageRecord, StoreError> {
    let role: String = column(row, "role")?;
    let conversation_id: String = column(row, "conversation_id")?;
    Ok(MessageRecord {
        id: column(row, "id")?,
        conversation_id: ConversationId(conversation_id),
        role: Role::parse(&role)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown message role '{role}'")))?,
        content: column(row, "content")?,
        sources: json_column(row, "sources")?,
        tool_calls: json_column(row, "tool_calls")?,
        created_at: column(row, "created_at")?,
    })
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

#[async_trait]
impl ConversationStore for PostgresStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (id, assistant, tenant_id, user_id, title, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(conversation.id.as_str())
        .bind(&conversation.assistant)
        .bind(&conversation.tenant_id)
        .bind(&conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.created_at)
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
             FROM conversations WHERE id = $1",
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
             VALUES ($1, $2, $3, $4, $5::jsonb, $6::jsonb, $7)",
        )
        .bind(&message.id)
        .bind(message.conversation_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(json_or_null(&message.sources)?)
        .bind(json_or_null(&message.tool_calls)?)
        .bind(message.created_at)
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
                 SELECT iid, id, conversation_id, role, content, \
                        sources::text AS sources, tool_calls::text AS tool_calls, created_at \
                 FROM messages WHERE conversation_id = $1 ORDER BY iid DESC LIMIT $2 \
             ) recent ORDER BY iid ASC",
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
impl UserDirectory for PostgresStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT id, tenant_id, role FROM users WHERE id = $1")
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
            "INSERT INTO users (id, tenant_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET tenant_id = EXCLUDED.tenant_id, role = EXCLUDED.role",
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
impl KnowledgeStore for PostgresStore {
    async fn search(&self, query: &KnowledgeQuery) -> Result<Vec<ScoredChunk>, StoreError> {
        let embedding = vector::to_pgvector(&query.embedding);

        let rows = sqlx::query(
            "SELECT chunk_id, namespace, tenant_id, document_id, document_title, chunk_text, \
                    category, roles, metadata::text AS metadata, \
                    1 - (embedding <=> $1::vector) AS similarity \
             FROM knowledge_chunks \
             WHERE namespace = $2 AND tenant_id = $3 \
               AND ($4::text IS NULL OR category = $4) \
               AND ($5::text IS NULL OR cardinality(roles) = 0 OR $5 = ANY(roles)) \
             ORDER BY embedding <=> $1::vector \
             LIMIT $6",
        )
        .bind(&embedding)
        .bind(&query.namespace)
        .bind(&query.tenant_id)
        .bind(&query.category)
        .bind(&query.role)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Knowledge search failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let metadata: String = column(row, "metadata")?;
                let similarity: f64 = column(row, "similarity")?;
                Ok(ScoredChunk {
                    chunk: KnowledgeChunk {
                        chunk_id: column(row, "chunk_id")?,
                        namespace: column(row, "namespace")?,
                        tenant_id: column(row, "tenant_id")?,
                        document_id: column(row, "document_id")?,
                        document_title: column(row, "document_title")?,
                        chunk_text: column(row, "chunk_text")?,
                        category: column(row, "category")?,
                        roles: column(row, "roles")?,
                        metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
                        embedding: Vec::new(),
                    },
                    similarity: similarity as f32,
                })
            })
            .collect()
    }

    async fn index_chunk(&self, chunk: KnowledgeChunk) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO knowledge_chunks \
             (chunk_id, namespace, tenant_id, document_id, document_title, chunk_text, \
              category, roles, metadata, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::jsonb, $10::vector) \
             ON CONFLICT (chunk_id) DO UPDATE SET \
               namespace = EXCLUDED.namespace, tenant_id = EXCLUDED.tenant_id, \
               document_id = EXCLUDED.document_id, document_title = EXCLUDED.document_title, \
               chunk_text = EXCLUDED.chunk_text, category = EXCLUDED.category, \
               roles = EXCLUDED.roles, metadata = EXCLUDED.metadata, \
               embedding = EXCLUDED.embedding",
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.namespace)
        .bind(&chunk.tenant_id)
        .bind(&chunk.document_id)
        .bind(&chunk.document_title)
        .bind(&chunk.chunk_text)
        .bind(&chunk.category)
        .bind(&chunk.roles)
        .bind(chunk.metadata.to_string())
        .bind(vector::to_pgvector(&chunk.embedding))
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
impl RecordSource for PostgresStore {
    async fn select(&self, query: &RecordQuery) -> Result<Vec<Value>, StoreError> {
        let rendered = render_select(query, Dialect::Postgres)?;
        // Let Postgres do the row-to-JSON conversion for arbitrary column types.
        let sql = format!("SELECT row_to_json(t)::text AS row FROM ({}) t", rendered.sql);
        debug!(sql = %sql, "Record query");

        let mut q = sqlx::query(&sql);
        for param in &rendered.params {
            q = bind_value(q, param);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{}: {e}", query.relation)))?;

        rows.iter()
            .map(|row| {
                let raw: String = column(row, "row")?;
                serde_json::from_str(&raw)
                    .map_err(|e| StoreError::QueryFailed(format!("row decode: {e}")))
            })
            .collect()
    }
}
