//! People Agent: answers "find people at this company"
//!
//! One candidate pool query on the primary path; a concurrent per-role
//! fan-out with LinkedIn-URL dedup on the multi-role path. The candidate
//! source is a seam: structured provider in production, heuristic snippet
//! parsing as a fallback, scripted sources in tests.

use crate::error::AgentError;
use crate::providers::candidates::{CandidatePage, CandidateQuery, CandidateSource};
use crate::schema::records::{CandidateResultSet, Person};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

pub struct PeopleAgent {
    source: Arc<dyn CandidateSource>,
}

impl PeopleAgent {
    pub fn new(source: Arc<dyn CandidateSource>) -> Self {
        Self { source }
    }

    /// One candidate pool query: role as title filter, company as keyword.
    pub async fn search_people(
        &self,
        company_name: &str,
        role: Option<&str>,
        num_results: i64,
        include_company_info: bool,
    ) -> Result<CandidateResultSet, AgentError> {
        if num_results <= 0 {
            return Err(AgentError::InvalidArgument(format!(
                "num_results must be positive, got {}",
                num_results
            )));
        }
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(AgentError::InvalidArgument(
                "company name must be non-empty".to_string(),
            ));
        }

        let limit = num_results as usize;
        let query = CandidateQuery {
            titles: role.map(|r| vec![r.to_string()]).unwrap_or_default(),
            expand_similar_titles: role.is_some(),
            keywords: Some(company_name.to_string()),
            per_page: (limit as u32).min(100),
            ..Default::default()
        };

        let page = match self.source.search_candidates(&query).await {
            Ok(page) => page,
            Err(err @ AgentError::MissingCredential(_)) => return Err(err),
            Err(err) => {
                // Provider trouble is non-fatal: degrade to an empty set
                log::warn!("[PEOPLE] Candidate search degraded to empty: {}", err);
                CandidatePage::default()
            }
        };

        let mut candidates = page.candidates;
        candidates.truncate(limit);

        log::info!(
            "[PEOPLE] search_people('{}', role={:?}) -> {} of {}",
            company_name,
            role,
            candidates.len(),
            page.total_entries
        );

        Ok(CandidateResultSet {
            candidates,
            organization: if include_company_info { page.organization } else { None },
            total_found: page.total_entries,
        })
    }

    /// One query per role, run concurrently, merged with LinkedIn-URL
    /// dedup. A failing role degrades to an empty contribution; a missing
    /// credential fails the whole call.
    pub async fn search_people_by_roles(
        &self,
        company_name: &str,
        roles: &[String],
    ) -> Result<CandidateResultSet, AgentError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(AgentError::InvalidArgument(
                "company name must be non-empty".to_string(),
            ));
        }
        if roles.is_empty() {
            return Err(AgentError::InvalidArgument(
                "at least one role is required".to_string(),
            ));
        }

        let futures = roles.iter().map(|role| {
            let query = CandidateQuery {
                titles: vec![role.clone()],
                expand_similar_titles: true,
                keywords: Some(company_name.to_string()),
                per_page: 10,
                ..Default::default()
            };
            async move { self.source.search_candidates(&query).await }
        });

        let results = join_all(futures).await;

        let mut merged = MergedCandidates::new();
        let mut total_found = 0u64;
        let mut organization = None;

        for (role, result) in roles.iter().zip(results) {
            match result {
                Ok(page) => {
                    total_found += page.total_entries;
                    if organization.is_none() {
                        organization = page.organization;
                    }
                    for person in page.candidates {
                        merged.insert(person);
                    }
                }
                Err(err @ AgentError::MissingCredential(_)) => return Err(err),
                Err(err) => {
                    log::warn!("[PEOPLE] Role '{}' degraded to empty: {}", role, err);
                }
            }
        }

        let candidates = merged.into_vec();
        log::info!(
            "[PEOPLE] search_people_by_roles('{}', {} roles) -> {} merged candidates",
            company_name,
            roles.len(),
            candidates.len()
        );

        Ok(CandidateResultSet {
            candidates,
            organization,
            total_found,
        })
    }
}

/// Merge accumulator. Records with a LinkedIn URL dedup by that URL with
/// last write winning on conflicting fields; records without one have no
/// stable key and are kept unconditionally. Provider-returned order is
/// preserved within each insert sequence.
struct MergedCandidates {
    ordered: Vec<Person>,
    by_linkedin: HashMap<String, usize>,
}

impl MergedCandidates {
    fn new() -> Self {
        Self {
            ordered: Vec::new(),
            by_linkedin: HashMap::new(),
        }
    }

    fn insert(&mut self, person: Person) {
        match person.linkedin_url.clone() {
            Some(url) => match self.by_linkedin.get(&url) {
                Some(&index) => self.ordered[index] = person,
                None => {
                    self.by_linkedin.insert(url, self.ordered.len());
                    self.ordered.push(person);
                }
            },
            None => self.ordered.push(person),
        }
    }

    fn into_vec(self) -> Vec<Person> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted source keyed by the first title in the query.
    struct ScriptedSource {
        pages: HashMap<String, CandidatePage>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(pages: Vec<(&str, CandidatePage)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CandidateSource for ScriptedSource {
        async fn search_candidates(
            &self,
            query: &CandidateQuery,
        ) -> Result<CandidatePage, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = query.titles.first().cloned().unwrap_or_default();
            Ok(self.pages.get(&key).cloned().unwrap_or_default())
        }
    }

    /// Source that always reports a missing credential.
    struct UnconfiguredSource;

    #[async_trait]
    impl CandidateSource for UnconfiguredSource {
        async fn search_candidates(
            &self,
            _query: &CandidateQuery,
        ) -> Result<CandidatePage, AgentError> {
            Err(AgentError::MissingCredential("candidate pool API key"))
        }
    }

    fn person(name: &str, title: &str, linkedin: Option<&str>) -> Person {
        let mut p = Person::named(name);
        p.title = Some(title.to_string());
        p.linkedin_url = linkedin.map(|u| u.to_string());
        p
    }

    fn page(candidates: Vec<Person>, total: u64) -> CandidatePage {
        CandidatePage {
            candidates,
            organization: None,
            total_entries: total,
            breadcrumbs: vec![],
        }
    }

    #[tokio::test]
    async fn test_non_positive_num_results_rejected_before_provider_call() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let agent = PeopleAgent::new(source.clone());

        for bad in [0i64, -3] {
            let err = agent.search_people("Acme", None, bad, false).await.unwrap_err();
            assert!(matches!(err, AgentError::InvalidArgument(_)));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_truncated_to_requested_count() {
        let many = (0..8).map(|i| person(&format!("P{}", i), "Eng", None)).collect();
        let source = Arc::new(ScriptedSource::new(vec![("", page(many, 8))]));
        let agent = PeopleAgent::new(source);

        let set = agent.search_people("Acme", None, 3, false).await.unwrap();
        assert_eq!(set.candidates.len(), 3);
        assert_eq!(set.total_found, 8);
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let agent = PeopleAgent::new(Arc::new(UnconfiguredSource));
        let err = agent.search_people("Acme", None, 5, false).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingCredential(_)));

        let err = agent
            .search_people_by_roles("Acme", &["CTO".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_merge_dedups_by_linkedin_url_last_write_wins() {
        let shared = "https://linkedin.com/in/janedoe";
        let source = Arc::new(ScriptedSource::new(vec![
            (
                "CTO",
                page(vec![person("Jane Doe", "CTO", Some(shared))], 1),
            ),
            (
                "Founder",
                page(
                    vec![
                        person("Jane Doe", "Founder & CTO", Some(shared)),
                        person("Bob Roe", "Founder", Some("https://linkedin.com/in/bobroe")),
                    ],
                    2,
                ),
            ),
        ]));
        let agent = PeopleAgent::new(source);

        let set = agent
            .search_people_by_roles("Acme", &["CTO".to_string(), "Founder".to_string()])
            .await
            .unwrap();

        let janes: Vec<_> = set
            .candidates
            .iter()
            .filter(|p| p.linkedin_url.as_deref() == Some(shared))
            .collect();
        assert_eq!(janes.len(), 1);
        // Last write wins on conflicting fields
        assert_eq!(janes[0].title.as_deref(), Some("Founder & CTO"));
        assert_eq!(set.candidates.len(), 2);
        assert_eq!(set.total_found, 3);
    }

    #[tokio::test]
    async fn test_candidates_without_linkedin_url_are_never_dropped() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("CTO", page(vec![person("Jane Doe", "CTO", None)], 1)),
            ("Founder", page(vec![person("Jane Doe", "Founder", None)], 1)),
        ]));
        let agent = PeopleAgent::new(source);

        let set = agent
            .search_people_by_roles("Acme", &["CTO".to_string(), "Founder".to_string()])
            .await
            .unwrap();

        // Near-duplicates with no stable key both survive
        assert_eq!(set.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_unset_credential_on_real_client_fails_without_http() {
        use crate::providers::candidates::CandidatePoolClient;

        let client = Arc::new(CandidatePoolClient::new(None));
        let agent = PeopleAgent::new(client);

        let err = agent.search_people("Acme", Some("CTO"), 5, false).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_empty_roles_rejected() {
        let agent = PeopleAgent::new(Arc::new(ScriptedSource::new(vec![])));
        let err = agent.search_people_by_roles("Acme", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }
}
