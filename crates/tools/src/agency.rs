//! Agency Creative Workroom tools: campaigns, team utilization, artifacts.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use workroom_core::error::ToolError;
use workroom_core::records::{RecordQuery, RecordSource};
use workroom_core::tool::{Tool, ToolContext};

use crate::args;

/// How far back utilization looks.
pub const UTILIZATION_WINDOW_DAYS: i64 = 30;
const UTILIZATION_ROW_LIMIT: usize = 50;
const ARTIFACT_LIMIT: usize = 20;

/// Exactly one row, or `NoMatch(not_found)`.
pub(crate) async fn single_row(
    records: &dyn RecordSource,
    query: RecordQuery,
    not_found: &str,
) -> Result<Value, ToolError> {
    let mut rows = records.select(&query.limit(2)).await?;
    match rows.len() {
        1 => Ok(rows.remove(0)),
        _ => Err(ToolError::NoMatch(not_found.to_string())),
    }
}

pub struct CampaignStatusTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl CampaignStatusTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

#[async_trait]
impl Tool for CampaignStatusTool {
    fn name(&self) -> &str {
        "get_campaign_status"
    }

    fn description(&self) -> &str {
        "Get status and metrics for a specific campaign"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "campaign_code": {
                    "type": "string",
                    "description": "The campaign code (e.g., SMI-001)"
                }
            },
            "required": ["campaign_code"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let code = args::required_str(&arguments, "campaign_code")?;
        let query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .eq("campaign_code", code);
        single_row(self.records.as_ref(), query, "Campaign not found").await
    }
}

pub struct TeamUtilizationTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl TeamUtilizationTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

/// Hours summed per employee over the utilization window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeUtilization {
    pub name: String,
    pub role: Value,
    pub total_hours: f64,
    pub billable_hours: f64,
    pub utilization_pct: f64,
}

/// Aggregate weekly rows per employee, in first-seen order.
pub fn aggregate_utilization(rows: &[Value]) -> Vec<EmployeeUtilization> {
    let mut order: Vec<EmployeeUtilization> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let name = args::text(row, "employee_name");
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            order.push(EmployeeUtilization {
                name,
                role: row.get("role").cloned().unwrap_or(Value::Null),
                total_hours: 0.0,
                billable_hours: 0.0,
                utilization_pct: 0.0,
            });
            order.len() - 1
        });
        order[slot].total_hours += args::number(row, "total_hours");
        order[slot].billable_hours += args::number(row, "billable_hours");
    }

    for employee in &mut order {
        employee.utilization_pct = args::percent(employee.billable_hours, employee.total_hours);
    }
    order
}

#[async_trait]
impl Tool for TeamUtilizationTool {
    fn name(&self) -> &str {
        "get_team_utilization"
    }

    fn description(&self) -> &str {
        "Get team utilization and capacity data"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": {
                    "type": "string",
                    "description": "Filter by specific role (optional)"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let since = (Utc::now().date_naive() - Duration::days(UTILIZATION_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string();

        let mut query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .gte("week_start_date", since);
        if let Some(role) = args::optional_str(&arguments, "role") {
            query = query.eq("role", role);
        }

        let rows = self
            .records
            .select(&query.limit(UTILIZATION_ROW_LIMIT))
            .await?;
        Ok(json!(aggregate_utilization(&rows)))
    }
}

pub struct ArtifactSearchTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl ArtifactSearchTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

#[async_trait]
impl Tool for ArtifactSearchTool {
    fn name(&self) -> &str {
        "search_artifacts"
    }

    fn description(&self) -> &str {
        "Search for creative artifacts by keyword or type"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Search keyword"
                },
                "artifact_type": {
                    "type": "string",
                    "description": "Filter by artifact type (creative_brief, script, storyboard, etc.)"
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let keyword = args::required_str(&arguments, "keyword")?;
        let mut query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .contains("title", keyword);
        if let Some(kind) = args::optional_str(&arguments, "artifact_type") {
            query = query.eq("artifact_type", kind);
        }

        let rows = self.records.select(&query.limit(ARTIFACT_LIMIT)).await?;
        Ok(Value::Array(rows))
    }
}
