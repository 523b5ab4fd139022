//! Agent Test Fixture
//!
//! A minimal harness for driving one tool-calling turn end to end against
//! live providers, without booting anything else.
//!
//! Usage:
//!   TEST_QUERY="research Acme Corp and draft an intro email to their CTO" \
//!   ROLO_CHAT_API_KEY="your-chat-key" \
//!   ROLO_SEARCH_API_KEY="your-search-key" \
//!   ROLO_PEOPLE_API_KEY="your-people-key" \
//!   cargo run --bin agent_test

use rolo_backend::agents::{OutreachAgent, PeopleAgent, ResearchAgent};
use rolo_backend::ai::{ChatClient, Message};
use rolo_backend::config::Config;
use rolo_backend::dispatcher::MessageDispatcher;
use rolo_backend::extract::StructuredExtractor;
use rolo_backend::gateway::EventBroadcaster;
use rolo_backend::providers::{CandidatePoolClient, SearchClient};
use rolo_backend::tools;
use std::env;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a research assistant inside a networking CRM. \
Use the available tools to research companies, find people, and draft outreach \
emails. Answer in plain text once you have what you need.";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let query = env::var("TEST_QUERY")
        .unwrap_or_else(|_| "Research the company Anthropic and summarize it.".to_string());

    let config = Config::from_env();

    let chat = ChatClient::new(
        &config.chat_api_key,
        Some(&config.chat_endpoint),
        config.chat_model.as_deref(),
        Some(config.max_tokens),
    )
    .expect("Failed to create chat client");
    let model = Arc::new(chat);

    let search = Arc::new(SearchClient::new(config.search_api_key.clone()));
    let candidates = Arc::new(CandidatePoolClient::new(config.people_api_key.clone()));
    let extractor = Arc::new(StructuredExtractor::new(model.clone()));

    let research = Arc::new(ResearchAgent::new(search.clone(), extractor.clone()));
    let people = Arc::new(PeopleAgent::new(candidates));
    let outreach = Arc::new(OutreachAgent::new(extractor));

    let registry = Arc::new(tools::create_default_registry(research, people, outreach));
    log::info!("Registered {} tools", registry.len());

    let broadcaster = Arc::new(EventBroadcaster::new());
    let dispatcher = MessageDispatcher::new(model, registry, broadcaster.clone());

    // Print the event stream while the turn runs
    let mut rx = broadcaster.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            println!("[event] {} {}", event.event, event.data);
        }
    });

    let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(query.as_str())];

    println!("Query: {}\n", query);
    match dispatcher.dispatch(messages).await {
        Ok(result) => {
            println!("\n=== Final response ({} rounds) ===", result.rounds_used);
            println!("{}", result.text);
            if result.budget_exhausted {
                println!("(turn budget exhausted)");
            }
            for call in &result.tool_calls {
                println!(
                    "tool {} [{}] {}ms",
                    call.name, call.state, call.duration_ms
                );
            }
        }
        Err(e) => {
            eprintln!("Turn failed: {}", e.user_message());
        }
    }

    printer.abort();
}
