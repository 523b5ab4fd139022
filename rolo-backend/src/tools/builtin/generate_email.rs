use crate::agents::outreach::{OutreachAgent, SenderInfo};
use crate::schema::records::{Person, Tone};
use crate::schema::{ObjectSchema, PropertySchema};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Exposes the Outreach Agent as a model-callable tool.
pub struct GenerateEmailTool {
    definition: ToolDefinition,
    agent: Arc<OutreachAgent>,
}

impl GenerateEmailTool {
    pub fn new(agent: Arc<OutreachAgent>) -> Self {
        GenerateEmailTool {
            definition: ToolDefinition {
                name: "generate_email".to_string(),
                description: "Draft a personalized outreach email to a contact. Use when the user wants to reach out, follow up, or introduce themselves.".to_string(),
                input_schema: ObjectSchema::new()
                    .require(
                        "contact_name",
                        PropertySchema::new("string", "Who the email is addressed to"),
                    )
                    .require(
                        "purpose",
                        PropertySchema::new("string", "What the email should accomplish"),
                    )
                    .property(
                        "contact_title",
                        PropertySchema::new("string", "The contact's role or title"),
                    )
                    .property(
                        "contact_company",
                        PropertySchema::new("string", "The contact's company"),
                    )
                    .property(
                        "tone",
                        PropertySchema::new("string", "Email tone (default professional)")
                            .with_enum(&["professional", "casual", "friendly"]),
                    )
                    .property(
                        "sender_name",
                        PropertySchema::new("string", "Who the email is from"),
                    )
                    .property(
                        "additional_context",
                        PropertySchema::new("string", "Anything else worth weaving in"),
                    )
                    .property(
                        "call_to_action",
                        PropertySchema::new("string", "The specific ask to end with"),
                    ),
            },
            agent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateEmailParams {
    contact_name: String,
    purpose: String,
    contact_title: Option<String>,
    contact_company: Option<String>,
    tone: Option<String>,
    sender_name: Option<String>,
    additional_context: Option<String>,
    call_to_action: Option<String>,
}

#[async_trait]
impl Tool for GenerateEmailTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: GenerateEmailParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let tone = params
            .tone
            .as_deref()
            .and_then(Tone::from_str)
            .unwrap_or_default();

        let mut contact = Person::named(&params.contact_name);
        contact.title = params.contact_title;
        contact.company = params.contact_company;

        let sender = params.sender_name.map(|name| SenderInfo {
            name,
            role: None,
            company: None,
        });

        match self
            .agent
            .generate_email(
                &contact,
                tone,
                &params.purpose,
                sender.as_ref(),
                params.additional_context.as_deref(),
                params.call_to_action.as_deref(),
            )
            .await
        {
            Ok(message) => {
                let summary = format!("Subject: {}\n\n{}", message.subject, message.body);
                let data = serde_json::to_value(&message).unwrap_or(Value::Null);
                ToolResult::success(summary).with_data(data)
            }
            Err(e) => {
                log::warn!("[TOOLS] generate_email failed: {}", e);
                ToolResult::error(e.user_message())
            }
        }
    }
}
