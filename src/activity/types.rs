//! Activity entry types

use crate::workflow::PhaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Activity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Start,
    Progress,
    Complete,
    Error,
    DataHandoff,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityKind::Start => "start",
            ActivityKind::Progress => "progress",
            ActivityKind::Complete => "complete",
            ActivityKind::Error => "error",
            ActivityKind::DataHandoff => "data-handoff",
        };
        f.write_str(label)
    }
}

/// Immutable log entry. `id` and `timestamp` are assigned by the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub assessment: Option<Uuid>,
    pub phase: Option<PhaseId>,
    pub tool: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Activity before it is sequenced by the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub assessment: Option<Uuid>,
    pub phase: Option<PhaseId>,
    pub tool: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            assessment: None,
            phase: None,
            tool: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Start, message)
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Progress, message)
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Complete, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Error, message)
    }

    pub fn handoff(message: impl Into<String>) -> Self {
        Self::new(ActivityKind::DataHandoff, message)
    }

    pub fn for_assessment(mut self, assessment: Uuid) -> Self {
        self.assessment = Some(assessment);
        self
    }

    pub fn with_step(mut self, phase: PhaseId, tool: impl Into<String>) -> Self {
        self.phase = Some(phase);
        self.tool = Some(tool.into());
        self
    }

    pub fn with_phase(mut self, phase: PhaseId) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn sequence(self, id: u64, timestamp: DateTime<Utc>) -> Activity {
        Activity {
            id,
            timestamp,
            kind: self.kind,
            assessment: self.assessment,
            phase: self.phase,
            tool: self.tool,
            message: self.message,
            data: self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ActivityKind::DataHandoff).unwrap();
        assert_eq!(json, "\"data-handoff\"");
        assert_eq!(ActivityKind::DataHandoff.to_string(), "data-handoff");
    }

    #[test]
    fn test_builder() {
        let id = Uuid::new_v4();
        let draft = NewActivity::error("nmap failed")
            .for_assessment(id)
            .with_step(PhaseId::Scanning, "nmap")
            .with_data(serde_json::json!({"reason": "exit 1"}));

        assert_eq!(draft.kind, ActivityKind::Error);
        assert_eq!(draft.assessment, Some(id));
        assert_eq!(draft.phase, Some(PhaseId::Scanning));
        assert_eq!(draft.tool.as_deref(), Some("nmap"));
        assert!(draft.data.is_some());
    }
}
