use crate::agents::ResearchAgent;
use crate::schema::{ObjectSchema, PropertySchema};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Exposes the Research Agent as a model-callable tool.
pub struct ResearchCompanyTool {
    definition: ToolDefinition,
    agent: Arc<ResearchAgent>,
}

impl ResearchCompanyTool {
    pub fn new(agent: Arc<ResearchAgent>) -> Self {
        ResearchCompanyTool {
            definition: ToolDefinition {
                name: "research_company".to_string(),
                description: "Research a company: what it does, its domain and social profiles, key people, and a research insight. Use when the user asks about a company.".to_string(),
                input_schema: ObjectSchema::new()
                    .require(
                        "company_name",
                        PropertySchema::new("string", "Name of the company to research"),
                    )
                    .property(
                        "additional_context",
                        PropertySchema::new("string", "Anything the user already told us about the company"),
                    )
                    .property(
                        "include_news",
                        PropertySchema::new("boolean", "Also search recent news (default false)"),
                    ),
            },
            agent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResearchCompanyParams {
    company_name: String,
    additional_context: Option<String>,
    #[serde(default)]
    include_news: bool,
}

#[async_trait]
impl Tool for ResearchCompanyTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: ResearchCompanyParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        match self
            .agent
            .research(
                &params.company_name,
                params.additional_context.as_deref(),
                params.include_news,
            )
            .await
        {
            Ok(report) => {
                let data = serde_json::to_value(&report).unwrap_or(Value::Null);
                let mut summary = format!(
                    "Researched {}: {}",
                    report.organization.name, report.insight
                );
                if let Some(domain) = &report.organization.domain {
                    summary.push_str(&format!(" (domain: {})", domain));
                }
                ToolResult::success(summary).with_data(data)
            }
            Err(e) => {
                log::warn!("[TOOLS] research_company failed: {}", e);
                ToolResult::error(e.user_message())
            }
        }
    }
}
