//! # Workroom Core
//!
//! Domain types, traits, and error definitions for the Workroom assistant
//! service. This crate has **no framework dependencies**; it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, conversation log, knowledge
//! index, business data, user directory) is a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with scripted/in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod history;
pub mod identity;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod records;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use history::ConversationStore;
pub use identity::{UserDirectory, UserProfile};
pub use knowledge::{KnowledgeChunk, KnowledgeQuery, KnowledgeStore, ScoredChunk};
pub use message::{
    Conversation, ConversationId, Message, MessageRecord, MessageToolCall, Role, Source,
    ToolCallRecord,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use records::{Filter, FilterOp, RecordQuery, RecordSource};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry};
