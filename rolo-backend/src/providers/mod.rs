pub mod backoff;
pub mod candidates;
pub mod heuristic;
pub mod search;

pub use backoff::BackoffTracker;
pub use candidates::{CandidatePage, CandidatePoolClient, CandidateQuery, CandidateSource};
pub use heuristic::HeuristicSource;
pub use search::{SearchClient, SearchOptions, SearchOutcome, SearchResult};
