pub mod outreach;
pub mod people;
pub mod research;

pub use outreach::{OutreachAgent, SenderInfo};
pub use people::PeopleAgent;
pub use research::ResearchAgent;
