//! The per-request orchestrator: persist, recall, retrieve, complete, resolve
//! tools, persist again.
//!
//! Tool calling is an explicit state machine. The first completion may ask
//! for tools; each round of tool calls is resolved in order and fed back,
//! and the model is offered tools again only while the round budget lasts.
//! A completion without tool calls, or any completion made without offering
//! tools, ends the turn.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use workroom_core::error::{Error, Result};
use workroom_core::history::ConversationStore;
use workroom_core::identity::UserProfile;
use workroom_core::message::{
    Conversation, ConversationId, Message, MessageRecord, MessageToolCall, Source, ToolCallRecord,
};
use workroom_core::provider::{Provider, ProviderRequest, ProviderResponse};
use workroom_core::tool::{ToolCall, ToolContext, ToolRegistry};
use workroom_store::{KnowledgeRetriever, RetrievalScope};
use workroom_tools::SearchResults;
use workroom_tools::knowledge::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

use crate::profile::AssistantProfile;
use crate::prompt;

/// One inbound user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantQuery {
    /// Continue this conversation; `None` starts a new one
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub message: String,
}

/// The assistant's answer for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub session_id: String,
    pub message: String,
    pub sources: Vec<Source>,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Where a turn is in its tool-resolution cycle.
#[derive(Debug, Clone, PartialEq)]
enum TurnState {
    AwaitingFirstCompletion,
    /// `round` tool rounds have been resolved so far.
    AwaitingToolResolution { round: usize },
    Completed(String),
}

pub struct Orchestrator {
    profile: AssistantProfile,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    conversations: Arc<dyn ConversationStore>,
    retriever: Arc<KnowledgeRetriever>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Orchestrator {
    pub fn new(
        profile: AssistantProfile,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        conversations: Arc<dyn ConversationStore>,
        retriever: Arc<KnowledgeRetriever>,
    ) -> Self {
        Self {
            profile,
            provider,
            tools,
            conversations,
            retriever,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn profile(&self) -> &AssistantProfile {
        &self.profile
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Answer one user message, persisting both sides of the exchange.
    pub async fn handle(&self, user: &UserProfile, query: AssistantQuery) -> Result<AssistantReply> {
        let text = query.message.trim();
        if text.is_empty() {
            return Err(Error::Validation("message is required".into()));
        }

        let conversation_id = self.resolve_conversation(user, query.session_id.as_deref(), text).await?;

        self.conversations
            .append_message(MessageRecord::user(&conversation_id, query.message.as_str()))
            .await?;

        let history = self
            .conversations
            .recent_messages(&conversation_id, self.profile.history_window)
            .await?;

        let hits = if self.profile.retrieval {
            self.retriever
                .retrieve(
                    text,
                    RetrievalScope {
                        namespace: &self.profile.knowledge_namespace,
                        tenant_id: &user.tenant_id,
                        role: Some(&user.role),
                        category: None,
                        limit: self.profile.knowledge_top_k,
                    },
                )
                .await?
        } else {
            Vec::new()
        };

        let system = prompt::render_system_prompt(
            &self.profile.persona,
            &user.role,
            &prompt::format_context(&hits),
        );
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system));
        messages.extend(history.iter().map(MessageRecord::to_message));

        let ctx = ToolContext {
            tenant_id: user.tenant_id.clone(),
            user_id: user.user_id.clone(),
            role: user.role.clone(),
        };
        let mut audit = Vec::new();
        let answer = self.run_turn(&ctx, &mut messages, &mut audit).await?;

        let sources = prompt::sources_from(&hits);
        self.conversations
            .append_message(MessageRecord::assistant(
                &conversation_id,
                answer.as_str(),
                sources.clone(),
                audit.clone(),
            ))
            .await?;

        info!(
            assistant = %self.profile.name,
            conversation = %conversation_id,
            tool_calls = audit.len(),
            sources = sources.len(),
            "Turn completed"
        );

        Ok(AssistantReply {
            session_id: conversation_id.0,
            message: answer,
            sources,
            tool_calls: audit,
        })
    }

    /// Search this assistant's knowledge base directly.
    pub async fn search_knowledge(
        &self,
        user: &UserProfile,
        query: &str,
        limit: Option<usize>,
        category: Option<&str>,
    ) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query is required".into()));
        }
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let hits = self
            .retriever
            .retrieve(
                query,
                RetrievalScope {
                    namespace: &self.profile.knowledge_namespace,
                    tenant_id: &user.tenant_id,
                    role: Some(&user.role),
                    category,
                    limit,
                },
            )
            .await?;
        Ok(SearchResults::new(query, hits))
    }

    /// Load the caller's conversation or start a new one.
    async fn resolve_conversation(
        &self,
        user: &UserProfile,
        session_id: Option<&str>,
        opening: &str,
    ) -> Result<ConversationId> {
        match session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let id = ConversationId::from(id);
                match self.conversations.get_conversation(&id).await? {
                    Some(conv)
                        if conv.is_owned_by(&user.tenant_id, &user.user_id)
                            && conv.assistant == self.profile.name =>
                    {
                        Ok(conv.id)
                    }
                    Some(_) => {
                        warn!(
                            assistant = %self.profile.name,
                            conversation = %id,
                            user = %user.user_id,
                            "Conversation belongs to another caller or assistant"
                        );
                        Err(Error::NotFound("Conversation not found".into()))
                    }
                    None => Err(Error::NotFound("Conversation not found".into())),
                }
            }
            None => {
                let conv = Conversation::new(
                    self.profile.name.as_str(),
                    user.tenant_id.as_str(),
                    user.user_id.as_str(),
                    opening,
                );
                let id = conv.id.clone();
                self.conversations.create_conversation(conv).await?;
                debug!(assistant = %self.profile.name, conversation = %id, "Conversation created");
                Ok(id)
            }
        }
    }

    fn offers_tools(&self, round: usize) -> bool {
        round < self.profile.max_tool_rounds && !self.tools.is_empty()
    }

    /// Drive the tool-resolution state machine to its terminal state.
    async fn run_turn(
        &self,
        ctx: &ToolContext,
        messages: &mut Vec<Message>,
        audit: &mut Vec<ToolCallRecord>,
    ) -> Result<String> {
        let mut state = TurnState::AwaitingFirstCompletion;
        loop {
            let round = match state {
                TurnState::AwaitingFirstCompletion => 0,
                TurnState::AwaitingToolResolution { round } => round,
                TurnState::Completed(answer) => return Ok(answer),
            };

            let offered = self.offers_tools(round);
            let response = self.complete(messages, offered).await?;
            let message = response.message;

            state = if offered && !message.tool_calls.is_empty() {
                debug!(
                    assistant = %self.profile.name,
                    round,
                    calls = message.tool_calls.len(),
                    "Resolving tool calls"
                );
                let calls = message.tool_calls.clone();
                messages.push(message);
                for call in &calls {
                    let record = self.resolve_call(ctx, call).await;
                    messages.push(Message::tool_result(call.id.as_str(), record.output.to_string()));
                    audit.push(record);
                }
                TurnState::AwaitingToolResolution { round: round + 1 }
            } else {
                TurnState::Completed(message.content)
            };
        }
    }

    async fn complete(&self, messages: &[Message], offer_tools: bool) -> Result<ProviderResponse> {
        let request = ProviderRequest {
            model: self.profile.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: if offer_tools {
                self.tools.definitions()
            } else {
                Vec::new()
            },
        };
        Ok(self.provider.complete(request).await?)
    }

    /// Execute one requested call; failures become an `{"error": ...}` output.
    async fn resolve_call(&self, ctx: &ToolContext, call: &MessageToolCall) -> ToolCallRecord {
        let arguments = if call.arguments.trim().is_empty() {
            Ok(serde_json::json!({}))
        } else {
            serde_json::from_str::<serde_json::Value>(&call.arguments)
        };

        match arguments {
            Ok(input) => {
                let output = self
                    .tools
                    .dispatch(
                        ctx,
                        &ToolCall {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            arguments: input.clone(),
                        },
                    )
                    .await;
                ToolCallRecord {
                    tool: call.name.clone(),
                    input,
                    output,
                }
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Model sent malformed tool arguments");
                ToolCallRecord {
                    tool: call.name.clone(),
                    input: serde_json::json!({}),
                    output: serde_json::json!({
                        "error": format!("Invalid tool arguments: {e}")
                    }),
                }
            }
        }
    }
}
