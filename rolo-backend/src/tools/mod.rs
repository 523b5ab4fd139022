pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{ToolDefinition, ToolResult};

use crate::agents::{OutreachAgent, PeopleAgent, ResearchAgent};
use std::sync::Arc;

/// Create a registry exposing the three agents as model-callable tools.
pub fn create_default_registry(
    research: Arc<ResearchAgent>,
    people: Arc<PeopleAgent>,
    outreach: Arc<OutreachAgent>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(builtin::ResearchCompanyTool::new(research)));
    registry.register(Arc::new(builtin::FindPeopleTool::new(people)));
    registry.register(Arc::new(builtin::GenerateEmailTool::new(outreach)));
    registry
}
