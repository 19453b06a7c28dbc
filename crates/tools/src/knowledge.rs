//! Knowledge-base search exposed as a tool, and the shared result shape
//! used by the HTTP search endpoint.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use workroom_core::error::ToolError;
use workroom_core::knowledge::ScoredChunk;
use workroom_core::tool::{Tool, ToolContext};
use workroom_store::{KnowledgeRetriever, RetrievalScope};

use crate::args;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const MAX_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_id: String,
    pub document_title: String,
    pub chunk_text: String,
    pub similarity: f32,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub results_count: usize,
    pub results: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(query: impl Into<String>, hits: Vec<ScoredChunk>) -> Self {
        let results: Vec<SearchHit> = hits
            .into_iter()
            .map(|hit| SearchHit {
                chunk_id: hit.chunk.chunk_id,
                document_id: hit.chunk.document_id,
                document_title: hit.chunk.document_title,
                chunk_text: hit.chunk.chunk_text,
                similarity: hit.similarity,
                metadata: hit.chunk.metadata,
            })
            .collect();
        Self {
            query: query.into(),
            results_count: results.len(),
            results,
        }
    }
}

/// Semantic search over one assistant's knowledge namespace.
pub struct KnowledgeSearchTool {
    name: String,
    description: String,
    namespace: String,
    retriever: Arc<KnowledgeRetriever>,
}

impl KnowledgeSearchTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        namespace: impl Into<String>,
        retriever: Arc<KnowledgeRetriever>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            namespace: namespace.into(),
            retriever,
        }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Natural language search query" },
                "limit": { "type": "number", "default": DEFAULT_SEARCH_LIMIT },
                "category": { "type": "string", "description": "Restrict to one document category (optional)" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let query = args::required_str(&arguments, "query")?;
        let limit = args::limit(&arguments, "limit", DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

        let hits = self
            .retriever
            .retrieve(
                query,
                RetrievalScope {
                    namespace: &self.namespace,
                    tenant_id: &ctx.tenant_id,
                    role: Some(&ctx.role),
                    category: args::optional_str(&arguments, "category"),
                    limit,
                },
            )
            .await
            .map_err(|e| ToolError::QueryFailed(e.to_string()))?;

        serde_json::to_value(SearchResults::new(query, hits))
            .map_err(|e| ToolError::QueryFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workroom_core::error::ProviderError;
    use workroom_core::knowledge::{KnowledgeChunk, KnowledgeStore};
    use workroom_core::message::Message;
    use workroom_core::provider::{
        EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    };
    use workroom_store::InMemoryStore;

    struct FixedEmbedder;

    #[async_trait]
    impl Provider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(""),
                usage: None,
                model: "none".into(),
            })
        }

        async fn embed(&self, r: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: r.inputs.iter().map(|_| vec![1.0, 0.0]).collect(),
                model: r.model,
                usage: None,
            })
        }
    }

    fn chunk(id: &str, roles: Vec<String>, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            chunk_id: id.into(),
            namespace: "scout".into(),
            tenant_id: "t1".into(),
            document_id: "playbook".into(),
            document_title: "Sari-sari Playbook".into(),
            chunk_text: format!("chunk {id}"),
            category: Some("best_practice".into()),
            roles,
            metadata: json!({"section": id}),
            embedding,
        }
    }

    #[tokio::test]
    async fn search_returns_ranked_results_for_role() {
        let store = Arc::new(InMemoryStore::new());
        store.index_chunk(chunk("near", vec![], vec![1.0, 0.1])).await.unwrap();
        store.index_chunk(chunk("far", vec![], vec![0.0, 1.0])).await.unwrap();
        store
            .index_chunk(chunk("secret", vec!["regional_manager".into()], vec![1.0, 0.0]))
            .await
            .unwrap();

        let retriever = Arc::new(KnowledgeRetriever::new(Arc::new(FixedEmbedder), store, "ada"));
        let tool = KnowledgeSearchTool::new("search_scout_knowledge", "Search", "scout", retriever);
        let ctx = ToolContext {
            tenant_id: "t1".into(),
            user_id: "u1".into(),
            role: "store_owner".into(),
        };

        let out = tool
            .execute(&ctx, json!({"query": "how to reduce stockouts", "limit": 2}))
            .await
            .unwrap();
        assert_eq!(out["query"], "how to reduce stockouts");
        assert_eq!(out["results_count"], 2);
        assert_eq!(out["results"][0]["chunk_id"], "near");
        assert_eq!(out["results"][0]["metadata"]["section"], "near");
    }
}
