//! Finance PPM tools: project profitability, work in progress, receivables.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use workroom_core::error::ToolError;
use workroom_core::records::{RecordQuery, RecordSource};
use workroom_core::tool::{Tool, ToolContext};

use crate::agency::single_row;
use crate::args;

pub const AGE_BUCKETS: [&str; 5] = ["current", "1-30", "31-60", "61-90", "90+"];

pub struct ProjectProfitabilityTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl ProjectProfitabilityTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

#[async_trait]
impl Tool for ProjectProfitabilityTool {
    fn name(&self) -> &str {
        "get_project_profitability"
    }

    fn description(&self) -> &str {
        "Get profitability metrics for a specific project"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_code": {
                    "type": "string",
                    "description": "The project code (e.g., ENG-TBWA-SMP-0001-P1)"
                }
            },
            "required": ["project_code"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let code = args::required_str(&arguments, "project_code")?;
        let query = RecordQuery::from(&self.relation)
            .eq("tenant_id", ctx.tenant_id.as_str())
            .eq("project_code", code);
        single_row(self.records.as_ref(), query, "Project not found").await
    }
}

pub struct WipSummaryTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl WipSummaryTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

#[async_trait]
impl Tool for WipSummaryTool {
    fn name(&self) -> &str {
        "get_wip_summary"
    }

    fn description(&self) -> &str {
        "Get work-in-progress summary for all projects or a specific client"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_name": {
                    "type": "string",
                    "description": "Filter by client name (optional)"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let mut query = RecordQuery::from(&self.relation).eq("tenant_id", ctx.tenant_id.as_str());
        if let Some(client) = args::optional_str(&arguments, "client_name") {
            query = query.eq("client_name", client);
        }
        Ok(Value::Array(self.records.select(&query).await?))
    }
}

pub struct ArAgingTool {
    records: Arc<dyn RecordSource>,
    relation: String,
}

impl ArAgingTool {
    pub fn new(records: Arc<dyn RecordSource>, relation: impl Into<String>) -> Self {
        Self {
            records,
            relation: relation.into(),
        }
    }
}

#[async_trait]
impl Tool for ArAgingTool {
    fn name(&self) -> &str {
        "get_ar_aging"
    }

    fn description(&self) -> &str {
        "Get accounts receivable aging report"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "age_bucket": {
                    "type": "string",
                    "enum": AGE_BUCKETS,
                    "description": "Filter by age bucket (optional)"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value, ToolError> {
        let mut query = RecordQuery::from(&self.relation).eq("tenant_id", ctx.tenant_id.as_str());
        if let Some(bucket) = args::optional_str(&arguments, "age_bucket") {
            let bucket = args::one_of(bucket, "age_bucket", &AGE_BUCKETS)?;
            query = query.eq("age_bucket", bucket);
        }
        Ok(Value::Array(self.records.select(&query).await?))
    }
}
