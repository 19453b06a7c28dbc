//! Logical relation names used by the tool packs, and their physical names.
//!
//! Tools ask for a relation by its logical name (`campaign_overview`,
//! `wip_summary`, ...). Deployments map those onto their own tables or
//! views through `[assistants.<name>.relations]`.

use std::collections::BTreeMap;

/// Built-in physical names, per assistant.
const DEFAULTS: &[(&str, &[(&str, &str)])] = &[
    (
        "agency",
        &[
            ("campaign_overview", "agency_campaign_overview"),
            ("employee_utilization", "agency_employee_utilization"),
            ("artifacts", "agency_artifacts"),
        ],
    ),
    (
        "finance_ppm",
        &[
            ("project_profitability", "finance_project_profitability"),
            ("wip_summary", "finance_wip_summary"),
            ("ar_aging", "finance_ar_aging"),
        ],
    ),
    (
        "scout",
        &[
            ("transaction_trends", "scout_transaction_trends"),
            ("transactions", "scout_transactions"),
            ("product_mix", "scout_product_mix"),
            ("substitution_flows", "scout_substitution_flows"),
            ("consumer_behavior", "scout_consumer_behavior"),
            ("consumer_profiling", "scout_consumer_profiling"),
            ("geo_intelligence", "scout_geo_intelligence"),
        ],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    names: BTreeMap<String, String>,
}

impl Relations {
    /// Defaults for one assistant. Unknown assistants start empty.
    pub fn defaults(assistant: &str) -> Self {
        let names = DEFAULTS
            .iter()
            .find(|(name, _)| *name == assistant)
            .map(|(_, pairs)| {
                pairs
                    .iter()
                    .map(|(logical, physical)| (logical.to_string(), physical.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Self { names }
    }

    /// Apply configured overrides on top of the current names.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (logical, physical) in overrides {
            self.names.insert(logical.clone(), physical.clone());
        }
        self
    }

    /// Physical name for a logical relation. Unmapped names pass through.
    pub fn get(&self, logical: &str) -> String {
        self.names
            .get(logical)
            .cloned()
            .unwrap_or_else(|| logical.to_string())
    }

    /// Logical names known for an assistant, used to flag typos in config.
    pub fn known_logical_names(assistant: &str) -> Vec<&'static str> {
        DEFAULTS
            .iter()
            .find(|(name, _)| *name == assistant)
            .map(|(_, pairs)| pairs.iter().map(|(logical, _)| *logical).collect())
            .unwrap_or_default()
    }
}
