//! Heuristic candidate extraction from free-text search snippets
//!
//! Explicitly a heuristic strategy: it pattern-matches name/title/company
//! out of ranked web snippets and sits behind the same `CandidateSource`
//! seam as the structured provider, so callers never know which one served
//! them. Used only on free-text snippets, never on structured provider data.

use crate::error::AgentError;
use crate::providers::candidates::{CandidatePage, CandidateQuery, CandidateSource};
use crate::providers::search::{SearchClient, SearchOptions, truncate_chars};
use crate::schema::records::Person;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Display caps keep heuristic output stable to render regardless of how
/// messy the source snippet was.
const MAX_NAME_CHARS: usize = 40;
const MAX_TITLE_CHARS: usize = 80;
const MAX_COMPANY_CHARS: usize = 60;

/// A run of 1-4 capitalized words, the usual shape of a western name in a
/// snippet title.
static CAPITALIZED_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3})\b").unwrap()
});

/// "at Acme" / "@ Acme" company attribution: the marker followed by a run
/// of capitalized tokens
static AT_COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[Aa]t|@)\s+([A-Z][A-Za-z0-9&.-]*(?:\s+[A-Z][A-Za-z0-9&.-]*){0,3})").unwrap()
});

/// Snippet titles split name from title on a dash or pipe
static DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–|]\s+").unwrap());

/// Parse one snippet into a person, defaulting the company to the query
/// target when the text names none. Returns None when no name-shaped text
/// can be found at all.
pub fn parse_person_from_snippet(text: &str, fallback_company: &str) -> Option<Person> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut split = DELIMITER.splitn(text, 2);
    let before = split.next().unwrap_or("").trim();
    let after = split.next().map(|s| s.trim().to_string());

    let name = extract_name(before, text)?;

    let title = after
        .as_deref()
        .map(|t| {
            // Keep only the title segment when the remainder chains more
            // delimiters ("CTO | Acme | Berlin")
            let first = DELIMITER.splitn(t, 2).next().unwrap_or(t);
            truncate_chars(first.trim(), MAX_TITLE_CHARS)
        })
        .filter(|t| !t.is_empty());

    let company = AT_COMPANY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| fallback_company.to_string());

    let mut person = Person::named(truncate_chars(&name, MAX_NAME_CHARS));
    person.title = title;
    person.company = Some(truncate_chars(&company, MAX_COMPANY_CHARS));
    Some(person)
}

/// Name extraction ladder: delimiter prefix when it looks like a name, else
/// the first capitalized-word run, else a truncated slice of the text.
fn extract_name(before_delimiter: &str, full_text: &str) -> Option<String> {
    if !before_delimiter.is_empty() {
        let words: Vec<&str> = before_delimiter.split_whitespace().collect();
        if (1..=4).contains(&words.len()) && before_delimiter.chars().count() <= MAX_NAME_CHARS {
            return Some(before_delimiter.to_string());
        }
    }

    if let Some(m) = CAPITALIZED_RUN.find(full_text) {
        return Some(m.as_str().to_string());
    }

    let fallback = truncate_chars(full_text, MAX_NAME_CHARS);
    if fallback.is_empty() { None } else { Some(fallback) }
}

/// Candidate source that searches the web and pattern-matches people out of
/// the snippets. Swappable with the structured provider without touching
/// callers.
pub struct HeuristicSource {
    search: Arc<SearchClient>,
}

impl HeuristicSource {
    pub fn new(search: Arc<SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl CandidateSource for HeuristicSource {
    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, AgentError> {
        let company = query.keywords.clone().unwrap_or_default();
        let role = query.titles.first().cloned().unwrap_or_default();
        let search_query = if role.is_empty() {
            format!("{} team leadership people LinkedIn", company)
        } else {
            format!("{} {} LinkedIn", company, role)
        };

        let opts = SearchOptions {
            num_results: (query.per_page as usize).clamp(1, 10),
            max_chars_per_result: 500,
            ..Default::default()
        };
        let outcome = self.search.search(&search_query, &opts).await;
        if let Some(err) = &outcome.error {
            log::warn!("[PEOPLE] Heuristic search degraded: {}", err);
        }

        let candidates: Vec<Person> = outcome
            .results
            .iter()
            .filter_map(|r| {
                let source_text = if r.title.is_empty() { &r.text } else { &r.title };
                parse_person_from_snippet(source_text, &company)
            })
            .collect();

        let total = candidates.len() as u64;
        Ok(CandidatePage {
            candidates,
            organization: None,
            total_entries: total,
            breadcrumbs: vec![format!("heuristic: {}", search_query)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_name_and_title() {
        let person =
            parse_person_from_snippet("Jane Doe - Chief Technology Officer at Acme", "Fallback")
                .unwrap();
        assert_eq!(person.name, "Jane Doe");
        assert_eq!(person.title.as_deref(), Some("Chief Technology Officer at Acme"));
        assert_eq!(person.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_pipe_delimiter_keeps_first_title_segment() {
        let person = parse_person_from_snippet("John Smith | VP Sales | Berlin", "Acme").unwrap();
        assert_eq!(person.name, "John Smith");
        assert_eq!(person.title.as_deref(), Some("VP Sales"));
    }

    #[test]
    fn test_long_prefix_falls_back_to_capitalized_run() {
        let text = "the profile page of senior staff engineer Maria Garcia Lopez - Engineering";
        let person = parse_person_from_snippet(text, "Acme").unwrap();
        assert_eq!(person.name, "Maria Garcia Lopez");
    }

    #[test]
    fn test_company_defaults_to_query_target() {
        let person = parse_person_from_snippet("Jane Doe - CTO", "Globex").unwrap();
        assert_eq!(person.company.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_fields_are_truncated_for_stable_rendering() {
        let long_title = format!("Jane Doe - {}", "x".repeat(300));
        let person = parse_person_from_snippet(&long_title, "Acme").unwrap();
        assert!(person.title.unwrap().chars().count() <= MAX_TITLE_CHARS);
        assert!(person.company.unwrap().chars().count() <= MAX_COMPANY_CHARS);
    }

    #[test]
    fn test_empty_snippet_yields_no_person() {
        assert!(parse_person_from_snippet("   ", "Acme").is_none());
    }

    #[tokio::test]
    async fn test_heuristic_source_degrades_with_searchless_client() {
        // No search key: the underlying search comes back empty and the
        // source still answers with an (empty) page rather than an error.
        let source = HeuristicSource::new(Arc::new(SearchClient::new(None)));
        let query = CandidateQuery {
            titles: vec!["CTO".to_string()],
            keywords: Some("Acme".to_string()),
            ..Default::default()
        };

        let page = source.search_candidates(&query).await.unwrap();
        assert!(page.candidates.is_empty());
        assert_eq!(page.breadcrumbs.len(), 1);
        assert!(page.breadcrumbs[0].contains("heuristic"));
    }
}
