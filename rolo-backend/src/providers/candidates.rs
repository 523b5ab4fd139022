//! Candidate pool provider client
//!
//! Wraps the external people-search service. Provider-native payloads are
//! deserialized into provider-shaped structs here and mapped to Person
//! records before anything leaves this module; absent fields stay absent.

use crate::error::AgentError;
use crate::providers::backoff::{BackoffTracker, is_reqwest_error_retryable};
use crate::schema::records::{Organization, Person, normalize_domain};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.apollo.io/v1/mixed_people/search";
const MAX_PER_PAGE: u32 = 200;

/// Structured filters for one candidate query.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub titles: Vec<String>,
    /// Let the provider expand to similar titles ("CTO" also matching
    /// "VP Engineering")
    pub expand_similar_titles: bool,
    pub keywords: Option<String>,
    pub person_locations: Vec<String>,
    pub seniorities: Vec<String>,
    pub organization_locations: Vec<String>,
    pub organization_domains: Vec<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for CandidateQuery {
    fn default() -> Self {
        CandidateQuery {
            titles: Vec::new(),
            expand_similar_titles: true,
            keywords: None,
            person_locations: Vec::new(),
            seniorities: Vec::new(),
            organization_locations: Vec::new(),
            organization_domains: Vec::new(),
            page: 1,
            per_page: 10,
        }
    }
}

/// One page of candidates, normalized to internal records.
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    pub candidates: Vec<Person>,
    pub organization: Option<Organization>,
    pub total_entries: u64,
    pub breadcrumbs: Vec<String>,
}

/// Seam between the People Agent and whatever produces candidates: the
/// structured provider in production, the heuristic snippet parser as a
/// fallback, scripted sources in tests.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, AgentError>;
}

// Provider wire format. Never escapes this module.

#[derive(Debug, Serialize)]
struct ProviderRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    person_titles: Vec<String>,
    include_similar_titles: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    q_keywords: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    person_locations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    person_seniorities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    organization_locations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    q_organization_domains: Vec<String>,
    page: u32,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    people: Vec<ProviderPerson>,
    #[serde(default)]
    pagination: ProviderPagination,
    #[serde(default)]
    breadcrumbs: Vec<ProviderBreadcrumb>,
}

#[derive(Debug, Deserialize, Default)]
struct ProviderPagination {
    #[serde(default)]
    total_entries: u64,
}

#[derive(Debug, Deserialize)]
struct ProviderBreadcrumb {
    label: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderPerson {
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    headline: Option<String>,
    linkedin_url: Option<String>,
    twitter_url: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    email: Option<String>,
    organization: Option<ProviderOrganization>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderOrganization {
    name: Option<String>,
    website_url: Option<String>,
    linkedin_url: Option<String>,
    industry: Option<String>,
    estimated_num_employees: Option<u64>,
    founded_year: Option<u32>,
    logo_url: Option<String>,
}

impl ProviderPerson {
    /// Map a provider record to a Person. Absent fields are omitted, never
    /// invented; a person with no usable name is dropped by the caller.
    fn into_person(self) -> Option<Person> {
        let name = match (self.name, &self.first_name, &self.last_name) {
            (Some(n), _, _) if !n.trim().is_empty() => n,
            (_, Some(f), Some(l)) => format!("{} {}", f, l),
            (_, Some(f), None) => f.clone(),
            _ => return None,
        };

        let location = [self.city, self.state, self.country]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let mut person = Person {
            name,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.organization.as_ref().and_then(|o| o.name.clone()),
            title: self.title,
            headline: self.headline,
            linkedin_url: self.linkedin_url,
            twitter_url: self.twitter_url,
            location: if location.is_empty() { None } else { Some(location) },
            emails: Vec::new(),
        };
        if let Some(email) = self.email {
            if !email.is_empty() {
                person.add_email(email);
            }
        }
        Some(person)
    }
}

impl ProviderOrganization {
    fn into_organization(self) -> Option<Organization> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        Some(Organization {
            name,
            domain: self.website_url.as_deref().and_then(normalize_domain),
            website: self.website_url,
            linkedin_url: self.linkedin_url,
            twitter_url: None,
            industry: self.industry,
            employee_count: self.estimated_num_employees,
            founded_year: self.founded_year,
            logo_url: self.logo_url,
        })
    }
}

/// Client for the external candidate pool service.
pub struct CandidatePoolClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl CandidatePoolClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(api_key: Option<String>, endpoint: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        CandidatePoolClient {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CandidateSource for CandidatePoolClient {
    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, AgentError> {
        // Credential check happens before any request is built; this is a
        // configuration error, not a retryable runtime condition.
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(AgentError::MissingCredential("candidate pool API key"))?;

        let request = ProviderRequest {
            person_titles: query.titles.clone(),
            include_similar_titles: query.expand_similar_titles,
            q_keywords: query.keywords.clone(),
            person_locations: query.person_locations.clone(),
            person_seniorities: query.seniorities.clone(),
            organization_locations: query.organization_locations.clone(),
            q_organization_domains: query.organization_domains.clone(),
            page: query.page.max(1),
            per_page: query.per_page.clamp(1, MAX_PER_PAGE),
        };

        let host = url::Url::parse(&self.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "candidates".to_string());
        let tracker = BackoffTracker::global();

        log::debug!(
            "[PEOPLE] Candidate query: titles={:?}, keywords={:?}, per_page={}",
            request.person_titles,
            request.q_keywords,
            request.per_page
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if is_reqwest_error_retryable(&e) {
                    tracker.record_error(&host);
                }
                AgentError::Provider(format!("candidate pool request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            if BackoffTracker::is_retryable_status(status.as_u16()) {
                tracker.record_error(&host);
            }
            return Err(AgentError::Provider(format!(
                "candidate pool returned {}",
                status
            )));
        }

        tracker.record_success(&host);

        let payload: ProviderResponse = response.json().await.map_err(|e| {
            AgentError::Provider(format!("malformed candidate payload: {}", e))
        })?;

        let mut first_org: Option<Organization> = None;
        let mut candidates = Vec::new();
        for provider_person in payload.people {
            if first_org.is_none() {
                if let Some(org) = provider_person.organization.clone() {
                    first_org = org.into_organization();
                }
            }
            if let Some(person) = provider_person.into_person() {
                candidates.push(person);
            }
        }

        let breadcrumbs = payload
            .breadcrumbs
            .into_iter()
            .filter_map(|b| {
                match (b.label, b.display_name) {
                    (Some(label), Some(display)) => Some(format!("{}: {}", label, display)),
                    (Some(label), None) => Some(label),
                    (None, Some(display)) => Some(display),
                    (None, None) => None,
                }
            })
            .collect();

        log::info!(
            "[PEOPLE] Candidate pool returned {} of {} total",
            candidates.len(),
            payload.pagination.total_entries
        );

        Ok(CandidatePage {
            candidates,
            organization: first_org,
            total_entries: payload.pagination.total_entries,
            breadcrumbs,
        })
    }
}
