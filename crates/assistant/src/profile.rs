//! Assistant profiles: persona, knowledge namespace and turn limits.
//!
//! The three built-in assistants share one orchestrator and differ only in
//! their profile and tool pack.

use workroom_config::{AssistantConfig, ProviderConfig};

/// Placeholder for the caller's role in a persona template.
pub const ROLE_PLACEHOLDER: &str = "{role}";
/// Placeholder for retrieved knowledge in a persona template.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

const AGENCY_PERSONA: &str = "You are a helpful AI assistant for an Agency Creative Workroom used by marketing agencies. You have access to:
1. Knowledge base documents (creative guides, templates, case studies, best practices)
2. Real-time campaign data (status, budgets, timelines, team utilization)

The user is a {role} at their agency. Provide accurate, helpful responses with a creative and strategic mindset.

Current knowledge context:
{context}";

const FINANCE_PPM_PERSONA: &str = "You are a helpful AI assistant for a Finance PPM (Project & Portfolio Management) system used by accounting firms. You have access to:
1. Knowledge base documents (SOPs, procedures, policies)
2. Real-time project data (profitability, WIP, AR aging)

The user is a {role} at their firm. Provide accurate, helpful responses based on the knowledge base and available tools.

Current knowledge context:
{context}";

const SCOUT_PERSONA: &str = "You are Suqi, an AI assistant for the Scout Dashboard retail analytics platform.

You help users analyze Philippine sari-sari store data across:
- Transaction trends (volume, revenue, basket size, duration)
- Product performance (categories, brands, substitutions)
- Consumer behavior (request types, suggestions, demographics)
- Geographic intelligence (regional performance, store distribution)

You have tools that query the Scout database and search the Scout knowledge base. Use them to answer questions with data-backed insights.

Guidelines:
- Be conversational and helpful
- Use data to support your answers
- Suggest visualizations when appropriate
- Focus on actionable insights for store owners
- Use Philippine context (regions, brands, categories)";

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantProfile {
    /// Route and storage name (e.g. "finance_ppm")
    pub name: String,

    /// Human-readable name
    pub display_name: String,

    /// System prompt template; may contain `{role}` and `{context}`
    pub persona: String,

    /// Knowledge namespace searched for context
    pub knowledge_namespace: String,

    /// Whether each turn retrieves knowledge before calling the model
    pub retrieval: bool,

    /// Most recent messages included in the prompt
    pub history_window: usize,

    /// Chunks retrieved per turn
    pub knowledge_top_k: usize,

    /// Completions that may offer tools before the answer is forced
    pub max_tool_rounds: usize,

    pub model: String,
}

impl AssistantProfile {
    /// A built-in profile with configured overrides applied.
    pub fn configured(
        name: &str,
        config: &AssistantConfig,
        provider: &ProviderConfig,
    ) -> Option<Self> {
        let (display_name, persona, retrieval_default) = match name {
            "agency" => ("Agency Creative Workroom", AGENCY_PERSONA, true),
            "finance_ppm" => ("Finance PPM", FINANCE_PPM_PERSONA, true),
            "scout" => ("Scout (Suqi)", SCOUT_PERSONA, false),
            _ => return None,
        };

        Some(Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            persona: persona.to_string(),
            knowledge_namespace: name.to_string(),
            retrieval: config.retrieval.unwrap_or(retrieval_default),
            history_window: config.history_window,
            knowledge_top_k: config.knowledge_top_k,
            max_tool_rounds: config.max_tool_rounds,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| provider.chat_model.clone()),
        })
    }

    /// A built-in profile with default settings.
    pub fn builtin(name: &str) -> Option<Self> {
        Self::configured(name, &AssistantConfig::default(), &ProviderConfig::default())
    }
}
