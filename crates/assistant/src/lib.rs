//! # Workroom Assistant
//!
//! Assistant profiles and the orchestrator that answers one user turn:
//! validate, persist the user message, replay recent history, retrieve
//! knowledge, run the tool-calling state machine, persist the answer.
//!
//! [`Assistants`] builds one [`Orchestrator`] per enabled built-in profile
//! from the application config.

pub mod orchestrator;
pub mod profile;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use workroom_config::{AppConfig, BUILTIN_ASSISTANTS};
use workroom_core::provider::Provider;
use workroom_store::{KnowledgeRetriever, Stores};
use workroom_tools::Relations;

pub use orchestrator::{AssistantQuery, AssistantReply, Orchestrator};
pub use profile::AssistantProfile;

/// The enabled assistants, by route name.
#[derive(Clone, Default)]
pub struct Assistants {
    by_name: BTreeMap<String, Arc<Orchestrator>>,
}

impl Assistants {
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, stores: &Stores) -> Self {
        let retriever = Arc::new(KnowledgeRetriever::new(
            provider.clone(),
            stores.knowledge.clone(),
            config.provider.embedding_model.clone(),
        ));

        let mut by_name = BTreeMap::new();
        for name in BUILTIN_ASSISTANTS {
            let settings = config.assistant(name);
            if !settings.enabled {
                info!(assistant = name, "Assistant disabled");
                continue;
            }

            let known = Relations::known_logical_names(name);
            for logical in settings.relations.keys() {
                if !known.contains(&logical.as_str()) {
                    warn!(assistant = name, relation = %logical, "Unknown relation override");
                }
            }
            let relations = Relations::defaults(name).with_overrides(&settings.relations);

            let (Some(profile), Some(tools)) = (
                AssistantProfile::configured(name, &settings, &config.provider),
                workroom_tools::registry_for(
                    name,
                    stores.records.clone(),
                    &relations,
                    retriever.clone(),
                ),
            ) else {
                continue;
            };

            let orchestrator = Orchestrator::new(
                profile,
                provider.clone(),
                Arc::new(tools),
                stores.conversations.clone(),
                retriever.clone(),
            )
            .with_temperature(config.provider.temperature)
            .with_max_tokens(config.provider.max_tokens);

            by_name.insert(name.to_string(), Arc::new(orchestrator));
        }

        Self { by_name }
    }

    pub fn insert(&mut self, orchestrator: Orchestrator) {
        self.by_name
            .insert(orchestrator.profile().name.clone(), Arc::new(orchestrator));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Orchestrator>> {
        self.by_name.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Orchestrator>> {
        self.by_name.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
