//! Message and Conversation domain types.
//!
//! Two shapes flow through the system:
//! - [`Message`] is a prompt message sent to / received from the model.
//! - [`MessageRecord`] is the persisted, immutable row in the conversation log,
//!   carrying the citation sources and tool-call audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a source excerpt before it is truncated.
pub const EXCERPT_CHARS: usize = 200;

/// Maximum length of an auto-generated conversation title.
pub const TITLE_CHARS: usize = 100;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (persona + retrieved context); never persisted
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

/// A single message in a model prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string, exactly as the model produced them
    pub arguments: String,
}

/// A conversation owned by one tenant/user pair and one assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    /// Name of the assistant profile that owns this conversation
    pub assistant: String,

    pub tenant_id: String,

    pub user_id: String,

    /// First characters of the opening message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation; the title is derived from the opening message.
    pub fn new(
        assistant: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        opening_message: &str,
    ) -> Self {
        let title: String = opening_message.chars().take(TITLE_CHARS).collect();
        Self {
            id: ConversationId::new(),
            assistant: assistant.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            title: (!title.is_empty()).then_some(title),
            created_at: Utc::now(),
        }
    }

    /// Whether this conversation belongs to the given tenant and user.
    pub fn is_owned_by(&self, tenant_id: &str, user_id: &str) -> bool {
        self.tenant_id == tenant_id && self.user_id == user_id
    }
}

/// A knowledge document cited by an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub title: String,
    pub excerpt: String,
}

impl Source {
    /// Build a document source, truncating the chunk text to an excerpt.
    pub fn document(id: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        excerpt.push_str("...");
        Self {
            kind: "document".into(),
            id: id.into(),
            title: title.into(),
            excerpt,
        }
    }
}

/// Audit entry for one tool invocation within an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
}

impl ToolCallRecord {
    /// Whether the tool reported an error object.
    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

/// A persisted message row. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// A user message row.
    pub fn user(conversation_id: &ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            tool_calls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// An assistant message row with its citations and tool audit trail.
    pub fn assistant(
        conversation_id: &ConversationId,
        content: impl Into<String>,
        sources: Vec<Source>,
        tool_calls: Vec<ToolCallRecord>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            role: Role::Assistant,
            content: content.into(),
            sources,
            tool_calls,
            created_at: Utc::now(),
        }
    }

    /// Convert the row back into a prompt message.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}
