//! Knowledge retriever: embed a question, then rank stored chunks.

use std::sync::Arc;
use tracing::debug;
use workroom_core::error::{Error, ProviderError, Result};
use workroom_core::knowledge::{KnowledgeQuery, KnowledgeStore, ScoredChunk};
use workroom_core::provider::{EmbeddingRequest, Provider};

/// Scope of one retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalScope<'a> {
    pub namespace: &'a str,
    pub tenant_id: &'a str,
    pub role: Option<&'a str>,
    pub category: Option<&'a str>,
    pub limit: usize,
}

pub struct KnowledgeRetriever {
    provider: Arc<dyn Provider>,
    store: Arc<dyn KnowledgeStore>,
    embedding_model: String,
}

impl KnowledgeRetriever {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn KnowledgeStore>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            embedding_model: embedding_model.into(),
        }
    }

    /// Turn free text into one embedding vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![text.to_string()],
            })
            .await?;

        response.embeddings.into_iter().next().ok_or_else(|| {
            Error::Provider(ProviderError::MalformedResponse(
                "embedding response contained no vectors".into(),
            ))
        })
    }

    /// Top-K chunks for `text` within `scope`, most similar first.
    pub async fn retrieve(&self, text: &str, scope: RetrievalScope<'_>) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embed(text).await?;
        let hits = self
            .store
            .search(&KnowledgeQuery {
                namespace: scope.namespace.to_string(),
                tenant_id: scope.tenant_id.to_string(),
                embedding,
                limit: scope.limit,
                role: scope.role.map(str::to_string),
                category: scope.category.map(str::to_string),
            })
            .await?;

        debug!(
            namespace = scope.namespace,
            tenant = scope.tenant_id,
            hits = hits.len(),
            "Knowledge retrieved"
        );
        Ok(hits)
    }
}
