//! Research Agent: answers "who/what is this company"
//!
//! Fans out to independent search branches concurrently, folds everything
//! the searches surfaced into one prompt, and extracts a Research Report.
//! A failing branch degrades to an empty outcome on its own; only an
//! extractor failure fails the agent.

use crate::error::AgentError;
use crate::extract::StructuredExtractor;
use crate::providers::search::{SearchClient, SearchOptions, SearchOutcome};
use crate::schema::records::{ResearchReport, normalize_domain};
use futures_util::future::join_all;
use std::sync::Arc;

pub struct ResearchAgent {
    search: Arc<SearchClient>,
    extractor: Arc<StructuredExtractor>,
}

impl ResearchAgent {
    pub fn new(search: Arc<SearchClient>, extractor: Arc<StructuredExtractor>) -> Self {
        Self { search, extractor }
    }

    pub async fn research(
        &self,
        company_name: &str,
        additional_context: Option<&str>,
        include_news: bool,
    ) -> Result<ResearchReport, AgentError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(AgentError::InvalidArgument(
                "company name must be non-empty".to_string(),
            ));
        }

        log::info!("[RESEARCH] Researching '{}' (news: {})", company_name, include_news);

        let mut branches: Vec<(&'static str, String, SearchOptions)> = vec![
            (
                "company info",
                format!("{} company overview products services", company_name),
                SearchOptions { num_results: 5, ..Default::default() },
            ),
            (
                "domain",
                format!("{} official website homepage", company_name),
                SearchOptions { num_results: 3, max_chars_per_result: 300, ..Default::default() },
            ),
            (
                "social profiles",
                format!("{} company profile", company_name),
                SearchOptions {
                    num_results: 3,
                    max_chars_per_result: 500,
                    domain_allow_list: Some(vec![
                        "linkedin.com".to_string(),
                        "twitter.com".to_string(),
                        "x.com".to_string(),
                    ]),
                    ..Default::default()
                },
            ),
        ];

        if include_news {
            branches.push((
                "news",
                format!("{} recent news announcements funding", company_name),
                SearchOptions {
                    num_results: 5,
                    freshness_days: Some(90),
                    ..Default::default()
                },
            ));
        }

        // Each branch resolves to an outcome on its own; a failure in one
        // never aborts its siblings.
        let futures = branches
            .iter()
            .map(|(_, query, opts)| self.search.search(query, opts));
        let outcomes: Vec<SearchOutcome> = join_all(futures).await;

        for ((label, _, _), outcome) in branches.iter().zip(&outcomes) {
            match &outcome.error {
                Some(err) => log::warn!("[RESEARCH] Branch '{}' degraded: {}", label, err),
                None => log::debug!(
                    "[RESEARCH] Branch '{}' returned {} results",
                    label,
                    outcome.results.len()
                ),
            }
        }

        let prompt = build_prompt(company_name, additional_context, &branches, &outcomes);

        let mut report: ResearchReport = self
            .extractor
            .extract(&prompt, &ResearchReport::schema())
            .await?;

        report.organization.domain = report
            .organization
            .domain
            .as_deref()
            .and_then(normalize_domain);

        log::info!(
            "[RESEARCH] Report for '{}': domain={:?}, {} key people, {} sources",
            report.organization.name,
            report.organization.domain,
            report.key_people.len(),
            report.sources.len()
        );

        Ok(report)
    }
}

fn build_prompt(
    company_name: &str,
    additional_context: Option<&str>,
    branches: &[(&'static str, String, SearchOptions)],
    outcomes: &[SearchOutcome],
) -> String {
    let mut prompt = format!(
        "Research the company \"{}\" using only the search results below. \
Produce a research report: the organization record, 3-5 key people if the \
results name any, one insight paragraph, and the sources you drew on. \
Omit any organization field the results do not support - do not guess.\n",
        company_name
    );

    if let Some(context) = additional_context {
        prompt.push_str(&format!("\nAdditional context from the user: {}\n", context));
    }

    for ((label, _, _), outcome) in branches.iter().zip(outcomes) {
        prompt.push_str(&format!("\n## Search results: {}\n", label));
        if outcome.results.is_empty() {
            prompt.push_str("(no results)\n");
            continue;
        }
        for result in &outcome.results {
            prompt.push_str(&format!("- {} ({})\n  {}\n", result.title, result.url, result.text));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;

    fn agent_with_script(responses: Vec<&str>) -> (ResearchAgent, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(responses));
        let extractor = Arc::new(StructuredExtractor::new(model.clone()));
        // No search key: every branch degrades to an empty outcome without
        // touching the network.
        let search = Arc::new(SearchClient::new(None));
        (ResearchAgent::new(search, extractor), model)
    }

    const ACME_REPORT: &str = r#"{
        "organization": {"name": "Acme"},
        "key_people": [],
        "insight": "Not much is known about Acme.",
        "sources": []
    }"#;

    #[tokio::test]
    async fn test_empty_name_rejected_before_any_call() {
        let (agent, model) = agent_with_script(vec![]);
        let err = agent.research("  ", None, false).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
        assert!(model.prompts_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_branches_empty_still_extracts() {
        // Scenario: every search branch comes back empty; the extractor is
        // still invoked and the report carries only the name.
        let (agent, model) = agent_with_script(vec![ACME_REPORT]);

        let report = agent.research("Acme", None, false).await.unwrap();
        assert_eq!(report.organization.name, "Acme");
        assert_eq!(report.organization.domain, None);
        assert!(report.key_people.is_empty());

        let prompts = model.prompts_seen.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("(no results)"));
    }

    #[tokio::test]
    async fn test_identical_inputs_yield_identical_organization() {
        let (agent, _) = agent_with_script(vec![ACME_REPORT, ACME_REPORT]);

        let first = agent.research("Acme", None, false).await.unwrap();
        let second = agent.research("Acme", None, false).await.unwrap();
        assert_eq!(first.organization, second.organization);
    }

    #[tokio::test]
    async fn test_model_domain_is_normalized() {
        let (agent, _) = agent_with_script(vec![r#"{
            "organization": {"name": "Acme", "domain": "https://www.acme.com/"},
            "key_people": [],
            "insight": "Acme makes everything.",
            "sources": [{"title": "Acme homepage", "url": "https://acme.com"}]
        }"#]);

        let report = agent.research("Acme", None, true).await.unwrap();
        assert_eq!(report.organization.domain.as_deref(), Some("acme.com"));
        assert_eq!(report.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_extractor_failure_fails_the_agent() {
        let (agent, _) = agent_with_script(vec!["this is not json at all"]);
        let err = agent.research("Acme", None, false).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Extract(crate::error::ExtractError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_additional_context_reaches_the_prompt() {
        let (agent, model) = agent_with_script(vec![ACME_REPORT]);
        agent
            .research("Acme", Some("they make anvils"), false)
            .await
            .unwrap();
        let prompts = model.prompts_seen.lock().unwrap();
        assert!(prompts[0].contains("they make anvils"));
    }
}
