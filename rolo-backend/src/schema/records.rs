//! Record types exchanged between the agents and the calling layer
//!
//! All records are transient: constructed per request, handed to the caller,
//! never cached or owned across requests by this core. A persistence layer
//! upstream may store them; this crate only shapes and validates them.

use super::{ObjectSchema, PropertySchema};
use serde::{Deserialize, Serialize};

/// An organization as assembled by the Research Agent. Every field except
/// `name` is optional; absent data stays absent rather than being invented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    /// Bare hostname, never with protocol or "www." prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Organization {
    pub fn named(name: impl Into<String>) -> Self {
        Organization {
            name: name.into(),
            domain: None,
            website: None,
            linkedin_url: None,
            twitter_url: None,
            industry: None,
            employee_count: None,
            founded_year: None,
            logo_url: None,
        }
    }
}

/// Reduce a model- or provider-supplied domain to a bare hostname:
/// no scheme, no path, no "www." prefix, lowercased.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let host = if trimmed.contains("://") {
        url::Url::parse(trimmed)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))?
    } else {
        // Bare input may still carry a path or port
        trimmed
            .split(['/', '?', '#', ':'])
            .next()
            .unwrap_or(trimmed)
            .to_string()
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() { None } else { Some(host) }
}

/// An email attached to a person, tagged with its position in the
/// provider-returned list. Position 0 is conventionally primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedEmail {
    pub email: String,
    pub is_primary: bool,
    pub position: u32,
}

/// A person as returned by the People or Research agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<TaggedEmail>,
}

impl Person {
    pub fn named(name: impl Into<String>) -> Self {
        Person {
            name: name.into(),
            first_name: None,
            last_name: None,
            company: None,
            title: None,
            headline: None,
            linkedin_url: None,
            twitter_url: None,
            location: None,
            emails: Vec::new(),
        }
    }

    /// Attach an email, keeping the invariant that at most one email is
    /// primary and that the primary one sits at position 0.
    pub fn add_email(&mut self, email: impl Into<String>) {
        let is_primary = self.emails.is_empty();
        let position = self.emails.len() as u32;
        self.emails.push(TaggedEmail {
            email: email.into(),
            is_primary,
            position,
        });
    }
}

/// A (title, url) pair naming where a research claim came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// The Research Agent's answer to "who/what is this company".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub organization: Organization,
    #[serde(default)]
    pub key_people: Vec<Person>,
    pub insight: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl ResearchReport {
    pub fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .require(
                "organization",
                PropertySchema::new(
                    "object",
                    "The organization: name (required), domain, website, linkedin_url, twitter_url, industry, employee_count, founded_year, logo_url",
                ),
            )
            .require(
                "key_people",
                PropertySchema::array_of(
                    PropertySchema::new("object", "A person: name (required), title, linkedin_url"),
                    "3-5 key people at the organization, empty if unknown",
                ),
            )
            .require(
                "insight",
                PropertySchema::new("string", "One paragraph of research insight about the organization"),
            )
            .require(
                "sources",
                PropertySchema::array_of(
                    PropertySchema::new("object", "A source: title and url"),
                    "Sources the insight draws on, empty if none",
                ),
            )
    }
}

/// The People Agent's answer to "find people at this company".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResultSet {
    pub candidates: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    pub total_found: u64,
}

/// Stylistic register for generated outreach email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
}

impl Tone {
    pub fn from_str(s: &str) -> Option<Tone> {
        match s.to_lowercase().as_str() {
            "professional" => Some(Tone::Professional),
            "casual" => Some(Tone::Casual),
            "friendly" => Some(Tone::Friendly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated outreach email. The body may contain real line breaks once
/// deserialized; on the wire they are `\n` escapes (see the extractor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub tone: Tone,
    pub call_to_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization_notes: Option<String>,
}

impl OutreachMessage {
    /// Schema for what the model must emit. Tone is supplied by the caller,
    /// not trusted from the model, so it is absent here.
    pub fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .require("subject", PropertySchema::new("string", "Email subject line"))
            .require(
                "body",
                PropertySchema::new(
                    "string",
                    "Email body. Escape every line break as \\n - do not emit literal line breaks inside the string",
                ),
            )
            .require(
                "call_to_action",
                PropertySchema::new("string", "The single concrete ask the email makes"),
            )
            .property(
                "personalization_notes",
                PropertySchema::new("string", "What was personalized and why"),
            )
    }
}
