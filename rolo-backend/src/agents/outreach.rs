//! Outreach Agent: turns a contact profile, tone, and purpose into email
//!
//! Every path funnels through the structured extractor, so the newline
//! repair fallback covers all three operations. An unrepairable response
//! surfaces as a parse-kind error, distinct from every other failure, so
//! the caller can suggest retrying with a different tone or purpose.

use crate::error::AgentError;
use crate::extract::StructuredExtractor;
use crate::schema::records::{OutreachMessage, Person, Tone};
use serde::Deserialize;
use std::sync::Arc;

/// Who the email is from, when the caller wants it woven in.
#[derive(Debug, Clone)]
pub struct SenderInfo {
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
}

/// What the model emits. Tone is supplied by the caller and stamped on
/// afterwards, never trusted from the model.
#[derive(Debug, Deserialize)]
struct EmailDraft {
    subject: String,
    body: String,
    call_to_action: String,
    #[serde(default)]
    personalization_notes: Option<String>,
}

pub struct OutreachAgent {
    extractor: Arc<StructuredExtractor>,
}

impl OutreachAgent {
    pub fn new(extractor: Arc<StructuredExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn generate_email(
        &self,
        contact: &Person,
        tone: Tone,
        purpose: &str,
        sender: Option<&SenderInfo>,
        additional_context: Option<&str>,
        call_to_action: Option<&str>,
    ) -> Result<OutreachMessage, AgentError> {
        if purpose.trim().is_empty() {
            return Err(AgentError::InvalidArgument(
                "purpose must be non-empty".to_string(),
            ));
        }

        log::info!(
            "[OUTREACH] Generating {} email to '{}' for: {}",
            tone,
            contact.name,
            purpose
        );

        let mut prompt = String::from("Write a personalized outreach email.\n\n");
        prompt.push_str(&contact_block(contact));
        prompt.push_str(&format!("\nPurpose: {}\n", purpose));
        prompt.push_str(&format!("Tone: {} - {}\n", tone, tone_guidance(tone)));

        if let Some(sender) = sender {
            prompt.push_str(&format!("\nSender: {}", sender.name));
            if let Some(role) = &sender.role {
                prompt.push_str(&format!(", {}", role));
            }
            if let Some(company) = &sender.company {
                prompt.push_str(&format!(" at {}", company));
            }
            prompt.push('\n');
        }

        if let Some(context) = additional_context {
            prompt.push_str(&format!("\nAdditional context: {}\n", context));
        }

        match call_to_action {
            Some(cta) => prompt.push_str(&format!("\nEnd with this call to action: {}\n", cta)),
            None => prompt.push_str("\nEnd with one clear, low-friction call to action.\n"),
        }

        prompt.push_str(ESCAPING_INSTRUCTIONS);

        self.draft(&prompt, tone).await
    }

    pub async fn generate_follow_up(
        &self,
        contact: &Person,
        tone: Tone,
        previous_email_text: &str,
        days_since_last: u32,
        call_to_action: Option<&str>,
    ) -> Result<OutreachMessage, AgentError> {
        if previous_email_text.trim().is_empty() {
            return Err(AgentError::InvalidArgument(
                "previous email text must be non-empty".to_string(),
            ));
        }

        log::info!(
            "[OUTREACH] Generating follow-up to '{}' ({} days since last)",
            contact.name,
            days_since_last
        );

        let mut prompt = String::from("Write a follow-up to an earlier outreach email.\n\n");
        prompt.push_str(&contact_block(contact));
        prompt.push_str(&format!(
            "\nThe previous email, sent {} days ago:\n---\n{}\n---\n",
            days_since_last, previous_email_text
        ));
        prompt.push_str(&format!("Tone: {} - {}\n", tone, tone_guidance(tone)));
        prompt.push_str(
            "Reference the previous email naturally without repeating it. \
Keep the follow-up shorter than the original.\n",
        );
        if let Some(cta) = call_to_action {
            prompt.push_str(&format!("End with this call to action: {}\n", cta));
        }
        prompt.push_str(ESCAPING_INSTRUCTIONS);

        self.draft(&prompt, tone).await
    }

    pub async fn improve_email(
        &self,
        original_text: &str,
        improvement_instructions: &str,
        tone: Tone,
    ) -> Result<OutreachMessage, AgentError> {
        if original_text.trim().is_empty() {
            return Err(AgentError::InvalidArgument(
                "original email text must be non-empty".to_string(),
            ));
        }

        log::info!("[OUTREACH] Improving email: {}", improvement_instructions);

        let mut prompt = String::from("Rewrite the email below.\n\n");
        prompt.push_str(&format!("Original email:\n---\n{}\n---\n", original_text));
        prompt.push_str(&format!("\nInstructions: {}\n", improvement_instructions));
        prompt.push_str(&format!("Tone: {} - {}\n", tone, tone_guidance(tone)));
        prompt.push_str(ESCAPING_INSTRUCTIONS);

        self.draft(&prompt, tone).await
    }

    async fn draft(&self, prompt: &str, tone: Tone) -> Result<OutreachMessage, AgentError> {
        let draft: EmailDraft = self
            .extractor
            .extract(prompt, &OutreachMessage::schema())
            .await?;

        Ok(OutreachMessage {
            subject: draft.subject,
            body: draft.body,
            tone,
            call_to_action: draft.call_to_action,
            personalization_notes: draft.personalization_notes,
        })
    }
}

const ESCAPING_INSTRUCTIONS: &str = "\nFormat the body with real paragraphs, \
but remember: inside the JSON string every line break must be the two \
characters \\n, never a literal line break.\n";

fn contact_block(contact: &Person) -> String {
    let mut block = format!("Contact: {}", contact.name);
    if let Some(title) = &contact.title {
        block.push_str(&format!(", {}", title));
    }
    if let Some(company) = &contact.company {
        block.push_str(&format!(" at {}", company));
    }
    if let Some(headline) = &contact.headline {
        block.push_str(&format!("\nHeadline: {}", headline));
    }
    if let Some(location) = &contact.location {
        block.push_str(&format!("\nLocation: {}", location));
    }
    block.push('\n');
    block
}

fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "courteous and direct, no slang, no exclamation marks",
        Tone::Casual => "relaxed and conversational, contractions welcome",
        Tone::Friendly => "warm and personable while staying concise",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::error::ExtractError;

    fn agent_with_script(responses: Vec<&str>) -> (OutreachAgent, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(responses));
        let extractor = Arc::new(StructuredExtractor::new(model.clone()));
        (OutreachAgent::new(extractor), model)
    }

    fn contact() -> Person {
        let mut p = Person::named("Jane Doe");
        p.title = Some("CTO".to_string());
        p.company = Some("Acme".to_string());
        p
    }

    #[tokio::test]
    async fn test_literal_newline_in_body_survives_as_two_lines() {
        // Scenario: the model emits an actual embedded newline inside the
        // body string; the repair pass turns it into a real two-line body
        // instead of a parse error.
        let (agent, _) = agent_with_script(vec![
            "{\"subject\": \"Hi\", \"body\": \"Line1\nLine2\", \"call_to_action\": \"Reply\"}",
        ]);

        let message = agent
            .generate_email(&contact(), Tone::Friendly, "introduce our product", None, None, None)
            .await
            .unwrap();

        assert_eq!(message.body, "Line1\nLine2");
        assert_eq!(message.body.lines().count(), 2);
        assert_eq!(message.tone, Tone::Friendly);
    }

    #[tokio::test]
    async fn test_unrepairable_output_is_a_distinct_parse_error() {
        let (agent, _) = agent_with_script(vec!["I'd rather not write JSON today."]);

        let err = agent
            .generate_email(&contact(), Tone::Professional, "say hello", None, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Extract(ExtractError::Parse { .. })));
        assert!(err.user_message().contains("different tone or purpose"));
    }

    #[tokio::test]
    async fn test_missing_required_field_is_a_validation_error() {
        let (agent, _) = agent_with_script(vec![r#"{"subject": "Hi", "body": "ok"}"#]);

        let err = agent
            .generate_email(&contact(), Tone::Professional, "say hello", None, None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::Extract(ExtractError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_prompt_carries_contact_tone_and_escaping_instructions() {
        let (agent, model) = agent_with_script(vec![
            r#"{"subject": "Hi", "body": "ok", "call_to_action": "Reply"}"#,
        ]);

        agent
            .generate_email(
                &contact(),
                Tone::Casual,
                "set up a coffee chat",
                Some(&SenderInfo {
                    name: "Sam Lee".to_string(),
                    role: Some("Founder".to_string()),
                    company: Some("Globex".to_string()),
                }),
                None,
                Some("grab 15 minutes this week"),
            )
            .await
            .unwrap();

        let prompts = model.prompts_seen.lock().unwrap();
        let prompt = &prompts[0];
        assert!(prompt.contains("Jane Doe, CTO at Acme"));
        assert!(prompt.contains("casual"));
        assert!(prompt.contains("Sam Lee, Founder at Globex"));
        assert!(prompt.contains("grab 15 minutes this week"));
        assert!(prompt.contains("\\n"));
    }

    #[tokio::test]
    async fn test_follow_up_references_previous_email() {
        let (agent, model) = agent_with_script(vec![
            r#"{"subject": "Re: Hi", "body": "ok", "call_to_action": "Reply"}"#,
        ]);

        agent
            .generate_follow_up(&contact(), Tone::Professional, "Original email body", 7, None)
            .await
            .unwrap();

        let prompts = model.prompts_seen.lock().unwrap();
        assert!(prompts[0].contains("7 days ago"));
        assert!(prompts[0].contains("Original email body"));
    }

    #[tokio::test]
    async fn test_improve_email_rewrites_with_instructions() {
        let (agent, model) = agent_with_script(vec![
            r#"{"subject": "Better", "body": "ok", "call_to_action": "Reply"}"#,
        ]);

        let message = agent
            .improve_email("Old draft", "make it shorter", Tone::Professional)
            .await
            .unwrap();

        assert_eq!(message.subject, "Better");
        let prompts = model.prompts_seen.lock().unwrap();
        assert!(prompts[0].contains("Old draft"));
        assert!(prompts[0].contains("make it shorter"));
    }

    #[tokio::test]
    async fn test_empty_purpose_rejected() {
        let (agent, model) = agent_with_script(vec![]);
        let err = agent
            .generate_email(&contact(), Tone::Professional, "  ", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
        assert!(model.prompts_seen.lock().unwrap().is_empty());
    }
}
