use std::env;

/// Process-wide configuration, read once at startup and injected into the
/// clients by reference. Never re-read per request.
#[derive(Clone)]
pub struct Config {
    pub chat_endpoint: String,
    pub chat_api_key: String,
    pub chat_model: Option<String>,
    pub max_tokens: u32,
    pub search_api_key: Option<String>,
    pub people_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            chat_endpoint: env::var("ROLO_CHAT_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            chat_api_key: env::var("ROLO_CHAT_API_KEY").expect("ROLO_CHAT_API_KEY must be set"),
            chat_model: env::var("ROLO_CHAT_MODEL").ok().filter(|m| !m.is_empty()),
            max_tokens: env::var("ROLO_MAX_TOKENS")
                .unwrap_or_else(|_| "4096".to_string())
                .parse()
                .expect("ROLO_MAX_TOKENS must be a valid number"),
            // Search is best-effort: a missing key degrades searches to empty results
            search_api_key: env::var("ROLO_SEARCH_API_KEY").ok().filter(|k| !k.is_empty()),
            // Candidate pool credential is checked at call time; absence is a
            // configuration error for the People Agent, not for the rest
            people_api_key: env::var("ROLO_PEOPLE_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}
