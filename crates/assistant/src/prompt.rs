//! System prompt rendering and citation sources.

use workroom_core::knowledge::ScoredChunk;
use workroom_core::message::Source;

use crate::profile::{CONTEXT_PLACEHOLDER, ROLE_PLACEHOLDER};

pub const NO_CONTEXT: &str = "No relevant documents found.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Format retrieved chunks as `[title]\ntext` blocks.
pub fn format_context(hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return NO_CONTEXT.to_string();
    }
    hits.iter()
        .map(|hit| format!("[{}]\n{}", hit.chunk.document_title, hit.chunk.chunk_text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Substitute the caller's role and the knowledge context into a persona.
pub fn render_system_prompt(template: &str, role: &str, context: &str) -> String {
    template
        .replace(ROLE_PLACEHOLDER, role)
        .replace(CONTEXT_PLACEHOLDER, context)
}

pub fn sources_from(hits: &[ScoredChunk]) -> Vec<Source> {
    hits.iter()
        .map(|hit| {
            Source::document(
                hit.chunk.document_id.clone(),
                hit.chunk.document_title.clone(),
                &hit.chunk.chunk_text,
            )
        })
        .collect()
}
