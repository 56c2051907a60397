//! Activity log
//!
//! Append-only, capped record of everything the engine does, read by
//! observers either by polling views or by subscribing.

pub mod log;
pub mod types;

pub use log::{ActivityLog, ACTIVITY_LOG_CAPACITY};
pub use types::{Activity, ActivityKind, NewActivity};
