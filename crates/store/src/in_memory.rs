//! In-memory backend: useful for testing and ephemeral deployments.
//!
//! Implements every storage trait over `RwLock`-guarded collections.
//! Business relations are seeded with [`InMemoryStore::insert_rows`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use workroom_core::error::StoreError;
use workroom_core::history::ConversationStore;
use workroom_core::identity::{UserDirectory, UserProfile};
use workroom_core::knowledge::{KnowledgeChunk, KnowledgeQuery, KnowledgeStore, ScoredChunk};
use workroom_core::message::{Conversation, ConversationId, MessageRecord};
use workroom_core::records::{RecordQuery, RecordSource};

use crate::filter::quote_identifier;
use crate::vector;

#[derive(Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    messages: RwLock<Vec<MessageRecord>>,
    users: RwLock<HashMap<String, UserProfile>>,
    chunks: RwLock<Vec<KnowledgeChunk>>,
    relations: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a relation, creating it if needed.
    pub async fn insert_rows(&self, relation: &str, rows: Vec<Value>) {
        self.relations
            .write()
            .await
            .entry(relation.to_string())
            .or_default()
            .extend(rows);
    }

    /// All messages of a conversation, oldest first.
    pub async fn messages_of(&self, id: &ConversationId) -> Vec<MessageRecord> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| &m.conversation_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(StoreError::Storage(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        conversations.insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError> {
        if !self
            .conversations
            .read()
            .await
            .contains_key(&message.conversation_id)
        {
            return Err(StoreError::Storage(format!(
                "conversation {} does not exist",
                message.conversation_id
            )));
        }
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let mut all = self.messages_of(id).await;
        let skip = all.len().saturating_sub(limit);
        Ok(all.split_off(skip))
    }

    async fn count_conversations(&self) -> Result<usize, StoreError> {
        Ok(self.conversations.read().await.len())
    }

    async fn count_messages(&self) -> Result<usize, StoreError> {
        Ok(self.messages.read().await.len())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn search(&self, query: &KnowledgeQuery) -> Result<Vec<ScoredChunk>, StoreError> {
        let chunks = self.chunks.read().await;
        Ok(vector::rank_chunks(chunks.iter(), query))
    }

    async fn index_chunk(&self, chunk: KnowledgeChunk) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().await;
        chunks.retain(|c| c.chunk_id != chunk.chunk_id);
        chunks.push(chunk);
        Ok(())
    }

    async fn count_chunks(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.read().await.len())
    }
}

#[async_trait]
impl RecordSource for InMemoryStore {
    async fn select(&self, query: &RecordQuery) -> Result<Vec<Value>, StoreError> {
        // Same identifier rules as the SQL backends.
        quote_identifier(&query.relation)?;
        for filter in &query.filters {
            quote_identifier(&filter.column)?;
        }

        let relations = self.relations.read().await;
        let rows = relations.get(&query.relation).ok_or_else(|| {
            StoreError::QueryFailed(format!("relation \"{}\" does not exist", query.relation))
        })?;
        Ok(query.apply(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recent_messages_returns_latest_window_in_order() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("agency", "t1", "u1", "hello");
        let id = conv.id.clone();
        store.create_conversation(conv).await.unwrap();
        for i in 0..25 {
            store
                .append_message(MessageRecord::user(&id, format!("m{i}")))
                .await
                .unwrap();
        }
        let recent = store.recent_messages(&id, 20).await.unwrap();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent.first().unwrap().content, "m5");
        assert_eq!(recent.last().unwrap().content, "m24");
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_fails() {
        let store = InMemoryStore::new();
        let err = store
            .append_message(MessageRecord::user(&ConversationId::from("nope"), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.count_messages().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn select_filters_rows() {
        let store = InMemoryStore::new();
        store
            .insert_rows(
                "agency_campaign_overview",
                vec![
                    json!({"tenant_id": "t1", "campaign_code": "SMI-001", "status": "active"}),
                    json!({"tenant_id": "t2", "campaign_code": "SMI-001", "status": "paused"}),
                ],
            )
            .await;
        let rows = store
            .select(
                &RecordQuery::from("agency_campaign_overview")
                    .eq("tenant_id", "t2")
                    .eq("campaign_code", "SMI-001"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "paused");
    }

    #[tokio::test]
    async fn select_missing_relation_is_query_error() {
        let store = InMemoryStore::new();
        let err = store
            .select(&RecordQuery::from("missing"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn user_upsert_and_lookup() {
        let store = InMemoryStore::new();
        assert!(store.lookup("u1").await.unwrap().is_none());
        store
            .upsert_user(UserProfile::new("u1", "t1", "producer"))
            .await
            .unwrap();
        store
            .upsert_user(UserProfile::new("u1", "t1", "account_manager"))
            .await
            .unwrap();
        assert_eq!(store.lookup("u1").await.unwrap().unwrap().role, "account_manager");
    }

    #[tokio::test]
    async fn index_chunk_replaces_by_id() {
        let store = InMemoryStore::new();
        let chunk = KnowledgeChunk {
            chunk_id: "c1".into(),
            namespace: "agency".into(),
            tenant_id: "t1".into(),
            document_id: "d1".into(),
            document_title: "Guide".into(),
            chunk_text: "v1".into(),
            category: None,
            roles: vec![],
            metadata: json!({}),
            embedding: vec![1.0, 0.0],
        };
        store.index_chunk(chunk.clone()).await.unwrap();
        store
            .index_chunk(KnowledgeChunk {
                chunk_text: "v2".into(),
                ..chunk
            })
            .await
            .unwrap();
        assert_eq!(store.count_chunks().await.unwrap(), 1);
        let hits = store
            .search(&KnowledgeQuery {
                namespace: "agency".into(),
                tenant_id: "t1".into(),
                embedding: vec![1.0, 0.0],
                limit: 3,
                role: None,
                category: None,
            })
            .await
            .unwrap();
        assert_eq!(hits[0].chunk.chunk_text, "v2");
    }
}
