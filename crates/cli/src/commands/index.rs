//! `workroom index` - Load knowledge chunks from a JSONL file.
//!
//! One JSON object per line. Lines without an `embedding` are embedded
//! through the configured provider.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use workroom_core::knowledge::KnowledgeChunk;
use workroom_providers::OpenAiCompatProvider;
use workroom_store::KnowledgeRetriever;

#[derive(Debug, Deserialize)]
struct ChunkLine {
    #[serde(default)]
    chunk_id: Option<String>,
    namespace: String,
    tenant_id: String,
    document_id: String,
    document_title: String,
    chunk_text: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl ChunkLine {
    fn into_chunk(self, line_no: usize, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            chunk_id: self
                .chunk_id
                .unwrap_or_else(|| format!("{}-{line_no}", self.document_id)),
            namespace: self.namespace,
            tenant_id: self.tenant_id,
            document_id: self.document_id,
            document_title: self.document_title,
            chunk_text: self.chunk_text,
            category: self.category,
            roles: self.roles,
            metadata: self.metadata.unwrap_or_else(|| serde_json::json!({})),
            embedding,
        }
    }
}

/// Parse the non-blank lines of a JSONL file, keeping 1-based line numbers.
fn parse_lines(content: &str) -> Result<Vec<(usize, ChunkLine)>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<ChunkLine>(line)
                .map(|chunk| (i + 1, chunk))
                .map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

pub async fn run(explicit: Option<&Path>, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let lines = parse_lines(&content)?;

    let stores = workroom_store::open(&config.database).await?;

    let needs_embedding = lines.iter().any(|(_, l)| l.embedding.is_none());
    let retriever = if needs_embedding {
        let provider = Arc::new(OpenAiCompatProvider::from_config(&config.provider)?);
        Some(KnowledgeRetriever::new(
            provider,
            stores.knowledge.clone(),
            config.provider.embedding_model.clone(),
        ))
    } else {
        None
    };

    let total = lines.len();
    for (line_no, mut line) in lines {
        let embedding = match (line.embedding.take(), &retriever) {
            (Some(embedding), _) => embedding,
            (None, Some(retriever)) => retriever.embed(&line.chunk_text).await?,
            (None, None) => return Err(format!("line {line_no}: no embedding").into()),
        };
        let chunk = line.into_chunk(line_no, embedding);
        debug!(chunk = %chunk.chunk_id, namespace = %chunk.namespace, "Indexing chunk");
        stores.knowledge.index_chunk(chunk).await?;
    }

    info!(chunks = total, file = %file.display(), "Knowledge indexed");
    println!("✅ Indexed {total} chunk(s) from {}", file.display());
    Ok(())
}
