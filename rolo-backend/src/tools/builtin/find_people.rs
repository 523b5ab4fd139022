use crate::agents::PeopleAgent;
use crate::schema::{ObjectSchema, PropertySchema};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Exposes the People Agent as a model-callable tool. A `roles` array
/// switches to the concurrent per-role search with dedup.
pub struct FindPeopleTool {
    definition: ToolDefinition,
    agent: Arc<PeopleAgent>,
}

impl FindPeopleTool {
    pub fn new(agent: Arc<PeopleAgent>) -> Self {
        FindPeopleTool {
            definition: ToolDefinition {
                name: "find_people".to_string(),
                description: "Find people at a company, optionally filtered by role. Pass several roles to search all of them at once. Use when the user wants contacts or introductions.".to_string(),
                input_schema: ObjectSchema::new()
                    .require(
                        "company_name",
                        PropertySchema::new("string", "Company to search within"),
                    )
                    .property("role", PropertySchema::new("string", "A single role or title filter"))
                    .property(
                        "roles",
                        PropertySchema::array_of(
                            PropertySchema::new("string", "A role or title"),
                            "Several roles to search concurrently",
                        ),
                    )
                    .property(
                        "num_results",
                        PropertySchema::new("integer", "How many people to return (default 5)"),
                    )
                    .property(
                        "include_company_info",
                        PropertySchema::new("boolean", "Also return the organization record (default false)"),
                    ),
            },
            agent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FindPeopleParams {
    company_name: String,
    role: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    num_results: Option<i64>,
    #[serde(default)]
    include_company_info: bool,
}

#[async_trait]
impl Tool for FindPeopleTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: FindPeopleParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let result = if params.roles.len() > 1 {
            self.agent
                .search_people_by_roles(&params.company_name, &params.roles)
                .await
        } else {
            let role = params
                .roles
                .first()
                .map(|r| r.as_str())
                .or(params.role.as_deref());
            self.agent
                .search_people(
                    &params.company_name,
                    role,
                    params.num_results.unwrap_or(5),
                    params.include_company_info,
                )
                .await
        };

        match result {
            Ok(set) => {
                let lines: Vec<String> = set
                    .candidates
                    .iter()
                    .map(|p| {
                        let title = p.title.as_deref().unwrap_or("unknown role");
                        format!("- {} ({})", p.name, title)
                    })
                    .collect();
                let summary = format!(
                    "Found {} people at {} ({} total in pool):\n{}",
                    set.candidates.len(),
                    params.company_name,
                    set.total_found,
                    lines.join("\n")
                );
                let data = serde_json::to_value(&set).unwrap_or(Value::Null);
                ToolResult::success(summary).with_data(data)
            }
            Err(e) => {
                log::warn!("[TOOLS] find_people failed: {}", e);
                ToolResult::error(e.user_message())
            }
        }
    }
}
