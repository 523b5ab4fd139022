//! Web search provider client
//!
//! Best-effort by contract: a failure of any kind degrades to an empty
//! result list plus an error descriptor, never an `Err`. Callers treat empty
//! as "no signal" and keep going.

use crate::providers::backoff::{BackoffTracker, is_reqwest_error_retryable};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider ceiling on results per query
const MAX_RESULTS_PER_QUERY: usize = 25;
const DEFAULT_ENDPOINT: &str = "https://api.exa.ai/search";

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub num_results: usize,
    pub domain_allow_list: Option<Vec<String>>,
    pub max_chars_per_result: usize,
    /// Only return results published within the last N days
    pub freshness_days: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            num_results: 5,
            domain_allow_list: None,
            max_chars_per_result: 1000,
            freshness_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Explicit success/failure value for one search branch: results that may
/// be empty, plus the reason when they are empty for a bad reason. Joined
/// deliberately by the agents instead of being a swallowed exception.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        SearchOutcome {
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// Provider wire format. These shapes never escape this module.

#[derive(Debug, Serialize)]
struct ProviderRequest {
    query: String,
    num_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<Vec<String>>,
    contents: ProviderContents,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProviderContents {
    text: ProviderTextOptions,
}

#[derive(Debug, Serialize)]
struct ProviderTextOptions {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    results: Vec<ProviderResult>,
}

#[derive(Debug, Deserialize)]
struct ProviderResult {
    title: Option<String>,
    url: String,
    text: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

/// Client for the external web-search service.
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(api_key: Option<String>, endpoint: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        SearchClient {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }

    /// Run one search. Never returns an error: failures come back as an
    /// empty outcome with a descriptor.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::failed("search query must be non-empty");
        }

        let api_key = match &self.api_key {
            Some(k) => k.clone(),
            None => {
                log::warn!("[SEARCH] No search API key configured, returning empty outcome");
                return SearchOutcome::failed("search provider key not configured");
            }
        };

        let num_results = opts.num_results.clamp(1, MAX_RESULTS_PER_QUERY);
        let start_published_date = opts.freshness_days.map(|days| {
            (Utc::now() - ChronoDuration::days(days as i64))
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        });

        let request = ProviderRequest {
            query: query.to_string(),
            num_results,
            include_domains: opts.domain_allow_list.clone(),
            contents: ProviderContents {
                text: ProviderTextOptions {
                    max_characters: opts.max_chars_per_result,
                },
            },
            start_published_date,
        };

        let host = url::Url::parse(&self.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "search".to_string());
        let tracker = BackoffTracker::global();

        log::debug!("[SEARCH] Query '{}' ({} results)", query, num_results);

        let response = match self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if is_reqwest_error_retryable(&e) {
                    tracker.record_error(&host);
                }
                log::warn!("[SEARCH] Request failed for '{}': {}", query, e);
                return SearchOutcome::failed(format!("search request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            if BackoffTracker::is_retryable_status(status.as_u16()) {
                tracker.record_error(&host);
            }
            log::warn!("[SEARCH] Provider returned {} for '{}'", status, query);
            return SearchOutcome::failed(format!("search provider returned {}", status));
        }

        tracker.record_success(&host);

        let payload: ProviderResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("[SEARCH] Malformed payload for '{}': {}", query, e);
                return SearchOutcome::failed(format!("malformed search payload: {}", e));
            }
        };

        let results = payload
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title.unwrap_or_default(),
                url: r.url,
                text: truncate_chars(&r.text.unwrap_or_default(), opts.max_chars_per_result),
                published_date: r.published_date,
            })
            .collect::<Vec<_>>();

        log::info!("[SEARCH] '{}' returned {} results", query, results.len());

        SearchOutcome {
            results,
            error: None,
        }
    }
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
