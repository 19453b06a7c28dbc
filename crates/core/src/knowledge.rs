//! Knowledge base: document chunks with embeddings, searched by similarity.
//!
//! The assistant path only ever reads chunks. Writing happens through
//! [`KnowledgeStore::index_chunk`], used by seeding tools and tests.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk of a knowledge document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub chunk_id: String,

    /// Which assistant's knowledge base this chunk belongs to (e.g. "agency")
    pub namespace: String,

    pub tenant_id: String,

    pub document_id: String,

    pub document_title: String,

    pub chunk_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Roles allowed to see this chunk. Empty means visible to every role.
    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Embedding vector (stored as blob in SQLite, `vector` in Postgres)
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl KnowledgeChunk {
    /// Whether a caller with `role` may see this chunk.
    pub fn visible_to(&self, role: Option<&str>) -> bool {
        match role {
            Some(role) => self.roles.is_empty() || self.roles.iter().any(|r| r == role),
            None => true,
        }
    }

    /// Whether this chunk matches an optional category filter.
    pub fn in_category(&self, category: Option<&str>) -> bool {
        match category {
            Some(c) => self.category.as_deref() == Some(c),
            None => true,
        }
    }
}

/// A similarity search over one namespace for one tenant.
#[derive(Debug, Clone)]
pub struct KnowledgeQuery {
    pub namespace: String,
    pub tenant_id: String,
    pub embedding: Vec<f32>,
    pub limit: usize,
    pub role: Option<String>,
    pub category: Option<String>,
}

/// A chunk plus its similarity to the query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: KnowledgeChunk,
    pub similarity: f32,
}

/// Storage and ranking of knowledge chunks.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Top `query.limit` chunks by descending similarity. No score threshold.
    async fn search(
        &self,
        query: &KnowledgeQuery,
    ) -> std::result::Result<Vec<ScoredChunk>, StoreError>;

    /// Insert or replace a chunk.
    async fn index_chunk(&self, chunk: KnowledgeChunk) -> std::result::Result<(), StoreError>;

    /// Number of chunks stored.
    async fn count_chunks(&self) -> std::result::Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(roles: &[&str], category: Option<&str>) -> KnowledgeChunk {
        KnowledgeChunk {
            chunk_id: "c1".into(),
            namespace: "agency".into(),
            tenant_id: "t1".into(),
            document_id: "d1".into(),
            document_title: "Brand Guide".into(),
            chunk_text: "Use the primary palette.".into(),
            category: category.map(String::from),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            metadata: serde_json::json!({}),
            embedding: vec![1.0, 0.0],
        }
    }

    #[test]
    fn unrestricted_chunk_is_visible_to_all_roles() {
        let c = chunk(&[], None);
        assert!(c.visible_to(Some("producer")));
        assert!(c.visible_to(None));
    }

    #[test]
    fn restricted_chunk_requires_matching_role() {
        let c = chunk(&["finance_manager"], None);
        assert!(c.visible_to(Some("finance_manager")));
        assert!(!c.visible_to(Some("producer")));
    }

    #[test]
    fn category_filter() {
        let c = chunk(&[], Some("policy"));
        assert!(c.in_category(None));
        assert!(c.in_category(Some("policy")));
        assert!(!c.in_category(Some("playbook")));
    }

    #[test]
    fn scored_chunk_flattens_and_skips_embedding() {
        let scored = ScoredChunk {
            chunk: chunk(&[], None),
            similarity: 0.9,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["document_title"], "Brand Guide");
        assert!(json.get("embedding").is_none());
    }
}
