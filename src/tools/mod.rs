//! Tool execution
//!
//! Provides the invoker seam the engine calls through, plus a process-backed
//! implementation:
//! - Tool classes with default time ceilings
//! - Catalog of command lines for standard recon tools
//! - Process invoker with budget enforcement

pub mod class;
pub mod invoker;
pub mod process;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use class::ToolClass;
pub use invoker::ToolInvoker;
pub use process::ProcessInvoker;
pub use registry::{ToolCatalog, ToolSpec};
pub use types::{FailureKind, Invocation};
