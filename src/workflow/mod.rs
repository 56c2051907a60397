//! Workflow templates
//!
//! Named assessment templates and the registry that holds them.

pub mod registry;
pub mod types;

pub use registry::TemplateRegistry;
pub use types::{Phase, PhaseId, Step, WorkflowTemplate};
