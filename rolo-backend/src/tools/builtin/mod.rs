pub mod find_people;
pub mod generate_email;
pub mod research_company;

pub use find_people::FindPeopleTool;
pub use generate_email::GenerateEmailTool;
pub use research_company::ResearchCompanyTool;
