//! Structured extraction from model output
//!
//! Models reliably produce well-formed JSON keys but unreliably escape
//! newlines inside long free-text values. The parse path is tiered for
//! exactly that: direct parse, then the first balanced object span, then a
//! character-level repair pass that escapes literal line breaks found inside
//! string literals. Nothing here attempts general JSON repair.

use crate::ai::{ChatModel, Message};
use crate::error::{ExtractError, ValidationError};
use crate::schema::{self, ObjectSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a structured data extraction engine. \
Respond with a single JSON object and nothing else - no prose, no markdown fences. \
Every line break inside a string value must be escaped as \\n. \
Omit fields you have no data for; never invent values.";

/// Sends one generation request and parses the response into a schema-valid
/// record. Holds the model by reference; constructed once at startup.
pub struct StructuredExtractor {
    model: Arc<dyn ChatModel>,
}

impl StructuredExtractor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// One generation call, then parse + validate + deserialize.
    pub async fn extract<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &ObjectSchema,
    ) -> Result<T, ExtractError> {
        let schema_json = serde_json::to_string_pretty(schema).unwrap_or_default();
        let user_prompt = format!(
            "{}\n\nRespond with a single JSON object matching this schema:\n{}",
            prompt, schema_json
        );

        let raw = self
            .model
            .generate_text(vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt)])
            .await
            .map_err(ExtractError::Generation)?;

        log::debug!("[EXTRACT] Raw model output ({} chars)", raw.len());

        let value = parse_object(&raw)?;
        schema::validate(&value, schema)?;

        serde_json::from_value(value).map_err(|e| {
            // Parsed and schema-checked, so a serde failure means a nested
            // field is missing or mistyped: a validation failure, not a
            // parse failure.
            ExtractError::Validation(ValidationError::new(vec![e.to_string()]))
        })
    }
}

/// Tiered parse of model output into a JSON object value.
pub fn parse_object(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = raw.trim();

    // Tier 1: the whole response is the object
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if v.is_object() {
            return Ok(v);
        }
    }

    // Tier 2: the first balanced {...} span (models wrap objects in prose
    // or markdown fences)
    let span = balanced_object_span(trimmed);
    if let Some(span) = span {
        if let Ok(v) = serde_json::from_str::<Value>(span) {
            if v.is_object() {
                return Ok(v);
            }
        }

        // Tier 3: escape literal line breaks inside string literals
        let repaired = escape_newlines_in_strings(span);
        if let Ok(v) = serde_json::from_str::<Value>(&repaired) {
            if v.is_object() {
                log::warn!("[EXTRACT] Repaired unescaped newlines in model output");
                return Ok(v);
            }
        }
    }

    Err(ExtractError::Parse {
        detail: format!(
            "no parseable JSON object in {} chars of model output",
            trimmed.len()
        ),
    })
}

/// Find the first balanced top-level `{...}` span, ignoring braces inside
/// string literals.
fn balanced_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace literal line breaks found inside string literals with their
/// two-character escaped form, leaving everything outside strings alone.
/// `\r\n` collapses to a single `\n` escape so breaks map 1:1.
fn escape_newlines_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str("\\n");
                }
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }

    out
}
