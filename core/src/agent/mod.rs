pub mod collaboration;
pub mod events;
pub mod loop_;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod roles;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use collaboration::{CollaborationResult, Coordinator, IndividualResults, RoleAgent, Stage};
pub use events::AgentEvent;
pub use loop_::{AgentLoop, RunOutcome, Step, StepKind, ToolErrorPolicy};
pub use parser::{Markers, ParsedResponse, ResponseParser};
pub use prompt::{Language, PromptBuilder};
pub use registry::ToolRegistry;
pub use roles::AgentRole;
pub use runtime::{AgentMode, Runtime, RuntimeResponse};
