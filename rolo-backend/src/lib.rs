//! Research and outreach agent core for the rolo networking CRM
//!
//! Wires an OpenAI-compatible chat model, a web-search provider, and a
//! candidate pool provider into three agents (research, people, outreach)
//! and a tool-calling dispatcher that lets the model orchestrate them
//! within bounded turns. Persistence, identity, and UI live elsewhere;
//! everything here is constructed per process and returns transient records.

pub mod agents;
pub mod ai;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod providers;
pub mod schema;
pub mod tools;
