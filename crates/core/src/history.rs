//! Conversation log: an append-only store of conversations and message rows.

use crate::error::StoreError;
use crate::message::{Conversation, ConversationId, MessageRecord};
use async_trait::async_trait;

/// Persistence for conversations and their messages.
///
/// Implementations: in-memory (for testing), SQLite, PostgreSQL.
/// Rows are never updated or deleted through this trait.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Insert a new conversation row.
    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> std::result::Result<(), StoreError>;

    /// Fetch a conversation by ID.
    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> std::result::Result<Option<Conversation>, StoreError>;

    /// Append a message row to its conversation.
    async fn append_message(&self, message: MessageRecord) -> std::result::Result<(), StoreError>;

    /// The most recent `limit` messages of a conversation, oldest first.
    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> std::result::Result<Vec<MessageRecord>, StoreError>;

    /// Total number of conversations.
    async fn count_conversations(&self) -> std::result::Result<usize, StoreError>;

    /// Total number of messages across all conversations.
    async fn count_messages(&self) -> std::result::Result<usize, StoreError>;
}
