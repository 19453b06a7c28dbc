//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and top-K ranking, plus the two on-disk
//! encodings of an embedding (little-endian f32 blob for SQLite, pgvector
//! text literal for PostgreSQL).

use workroom_core::knowledge::{KnowledgeChunk, KnowledgeQuery, ScoredChunk};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank candidate chunks against a query.
///
/// Applies the namespace, tenant, category and role filters, scores the
/// survivors by cosine similarity, and keeps the top `query.limit`.
/// There is no score threshold: a chunk is returned whenever it is among
/// the top K.
pub fn rank_chunks<'a>(
    candidates: impl IntoIterator<Item = &'a KnowledgeChunk>,
    query: &KnowledgeQuery,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .filter(|c| c.namespace == query.namespace && c.tenant_id == query.tenant_id)
        .filter(|c| c.in_category(query.category.as_deref()))
        .filter(|c| c.visible_to(query.role.as_deref()))
        .map(|c| ScoredChunk {
            similarity: cosine_similarity(&c.embedding, &query.embedding),
            chunk: c.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(query.limit);
    scored
}

/// Encode an embedding as a little-endian f32 blob.
pub fn to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob. Trailing partial floats are ignored.
pub fn from_blob(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Render an embedding as a pgvector literal, e.g. `[0.1,0.2,0.3]`.
pub fn to_pgvector(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, tenant: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            chunk_id: id.into(),
            namespace: "agency".into(),
            tenant_id: tenant.into(),
            document_id: format!("doc-{id}"),
            document_title: format!("Doc {id}"),
            chunk_text: "text".into(),
            category: None,
            roles: vec![],
            metadata: serde_json::json!({}),
            embedding,
        }
    }

    fn query(limit: usize) -> KnowledgeQuery {
        KnowledgeQuery {
            namespace: "agency".into(),
            tenant_id: "t1".into(),
            embedding: vec![1.0, 0.0],
            limit,
            role: None,
            category: None,
        }
    }

    #[test]
    fn identical_vectors() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_and_opposite_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_or_empty_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_orders_by_similarity_and_truncates() {
        let chunks = vec![
            chunk("far", "t1", vec![0.0, 1.0]),
            chunk("near", "t1", vec![1.0, 0.1]),
            chunk("mid", "t1", vec![1.0, 1.0]),
        ];
        let ranked = rank_chunks(&chunks, &query(2));
        let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }

    #[test]
    fn rank_keeps_low_scores_without_threshold() {
        let chunks = vec![chunk("opposite", "t1", vec![-1.0, 0.0])];
        let ranked = rank_chunks(&chunks, &query(3));
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].similarity < 0.0);
    }

    #[test]
    fn rank_scopes_by_tenant_and_role() {
        let mut restricted = chunk("restricted", "t1", vec![1.0, 0.0]);
        restricted.roles = vec!["finance_manager".into()];
        let chunks = vec![
            chunk("other-tenant", "t2", vec![1.0, 0.0]),
            restricted,
            chunk("open", "t1", vec![0.5, 0.5]),
        ];
        let mut q = query(5);
        q.role = Some("producer".into());
        let ranked = rank_chunks(&chunks, &q);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chunk.chunk_id, "open");
    }

    #[test]
    fn blob_encoding() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(from_blob(&to_blob(&v)), v);
        assert_eq!(to_blob(&v).len(), 12);
    }

    #[test]
    fn pgvector_literal() {
        assert_eq!(to_pgvector(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
    }
}
