//! Assessment reports
//!
//! JSON snapshot of one assessment: final state, gathered intelligence and
//! the activities that belong to it (oldest first).

use crate::activity::Activity;
use crate::engine::{ExecutionEngine, ExecutionState};
use crate::intel::IntelligenceRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub generated_at: DateTime<Utc>,
    pub state: ExecutionState,
    pub success_rate: f64,
    pub intelligence: BTreeMap<String, IntelligenceRecord>,
    /// Retained activities of this assessment, oldest first
    pub activities: Vec<Activity>,
}

impl AssessmentReport {
    pub fn from_engine(engine: &ExecutionEngine) -> Self {
        let state = engine.state();
        let assessment = state.assessment;

        let mut activities = engine
            .activity()
            .filter(|activity| activity.assessment == Some(assessment));
        activities.reverse();

        Self {
            generated_at: Utc::now(),
            success_rate: state.success_rate(),
            intelligence: engine.intelligence().into_iter().collect(),
            state,
            activities,
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create report directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;

        serde_json::from_str(&json).context("Failed to deserialize report")
    }
}

/// Report path for `target`; with several targets each gets its own file
pub fn report_path(base: &Path, target: &str, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }

    let slug: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let extension = base
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("json");

    base.with_file_name(format!("{}-{}.{}", stem, slug, extension))
}
