//! Intelligence
//!
//! What tools found, and how it flows into the next tool's input:
//! - Pattern extraction from raw tool output
//! - Per-tool record store, one record per tool
//! - Handoff resolution with per-class priority chains

pub mod extractor;
pub mod handoff;
pub mod store;

pub use extractor::{IntelligenceExtractor, PatternExtractor};
pub use handoff::{HandoffSource, Resolution};
pub use store::{keys, Intelligence, IntelligenceRecord, IntelligenceStore, OpenPort};
