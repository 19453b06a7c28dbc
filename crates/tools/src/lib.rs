//! Read-only domain tools for the Workroom assistants.
//!
//! Three packs, one per assistant:
//! - `agency`: campaign status, team utilization, artifact search
//! - `finance_ppm`: project profitability, WIP, AR aging
//! - `scout`: retail transaction, product, consumer and regional analytics,
//!   plus knowledge-base search
//!
//! Every tool filters by the caller's tenant and never writes.

pub mod agency;
pub mod args;
pub mod finance_ppm;
pub mod knowledge;
pub mod relations;
pub mod scout;

use std::sync::Arc;
use workroom_core::records::RecordSource;
use workroom_core::tool::ToolRegistry;
use workroom_store::KnowledgeRetriever;

pub use knowledge::{KnowledgeSearchTool, SearchResults};
pub use relations::Relations;

pub fn agency_registry(records: Arc<dyn RecordSource>, relations: &Relations) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(agency::CampaignStatusTool::new(
        records.clone(),
        relations.get("campaign_overview"),
    )));
    registry.register(Box::new(agency::TeamUtilizationTool::new(
        records.clone(),
        relations.get("employee_utilization"),
    )));
    registry.register(Box::new(agency::ArtifactSearchTool::new(
        records,
        relations.get("artifacts"),
    )));
    registry
}

pub fn finance_ppm_registry(records: Arc<dyn RecordSource>, relations: &Relations) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(finance_ppm::ProjectProfitabilityTool::new(
        records.clone(),
        relations.get("project_profitability"),
    )));
    registry.register(Box::new(finance_ppm::WipSummaryTool::new(
        records.clone(),
        relations.get("wip_summary"),
    )));
    registry.register(Box::new(finance_ppm::ArAgingTool::new(
        records,
        relations.get("ar_aging"),
    )));
    registry
}

pub fn scout_registry(
    records: Arc<dyn RecordSource>,
    relations: &Relations,
    retriever: Arc<KnowledgeRetriever>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(scout::TransactionTrendsTool::new(records.clone(), relations)));
    registry.register(Box::new(scout::ProductPerformanceTool::new(records.clone(), relations)));
    registry.register(Box::new(scout::ConsumerSegmentsTool::new(records.clone(), relations)));
    registry.register(Box::new(scout::RegionalPerformanceTool::new(records, relations)));
    registry.register(Box::new(KnowledgeSearchTool::new(
        "search_scout_knowledge",
        "Search the Scout knowledge base for insights, best practices, and case studies",
        "scout",
        retriever,
    )));
    registry
}

/// The tool pack for a built-in assistant, or `None` for an unknown name.
pub fn registry_for(
    assistant: &str,
    records: Arc<dyn RecordSource>,
    relations: &Relations,
    retriever: Arc<KnowledgeRetriever>,
) -> Option<ToolRegistry> {
    match assistant {
        "agency" => Some(agency_registry(records, relations)),
        "finance_ppm" => Some(finance_ppm_registry(records, relations)),
        "scout" => Some(scout_registry(records, relations, retriever)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workroom_core::error::ProviderError;
    use workroom_core::message::Message;
    use workroom_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use workroom_store::InMemoryStore;

    struct NoModel;

    #[async_trait::async_trait]
    impl Provider for NoModel {
        fn name(&self) -> &str {
            "none"
        }
        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(""),
                usage: None,
                model: "none".into(),
            })
        }
    }

    fn registry(name: &str) -> Option<ToolRegistry> {
        let store = Arc::new(InMemoryStore::new());
        let retriever = Arc::new(KnowledgeRetriever::new(Arc::new(NoModel), store.clone(), "e"));
        registry_for(name, store, &Relations::defaults(name), retriever)
    }

    #[test]
    fn packs_declare_tools_in_order() {
        assert_eq!(
            registry("agency").unwrap().names(),
            vec!["get_campaign_status", "get_team_utilization", "search_artifacts"]
        );
        assert_eq!(
            registry("finance_ppm").unwrap().names(),
            vec!["get_project_profitability", "get_wip_summary", "get_ar_aging"]
        );
        assert_eq!(
            registry("scout").unwrap().names(),
            vec![
                "get_transaction_trends",
                "get_product_performance",
                "get_consumer_segments",
                "get_regional_performance",
                "search_scout_knowledge",
            ]
        );
        assert!(registry("hr").is_none());
    }

    #[test]
    fn every_schema_is_an_object() {
        for name in ["agency", "finance_ppm", "scout"] {
            for def in registry(name).unwrap().definitions() {
                assert_eq!(def.parameters["type"], "object", "{}", def.name);
            }
        }
    }
}
