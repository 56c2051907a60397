//! Workflow template types
//!
//! A template is an ordered list of phases, each an ordered list of tool
//! identifiers. The engine never walks phases directly: it works on the
//! flattened `(phase, tool)` step list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Assessment phase identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Reconnaissance,
    Scanning,
    Enumeration,
    VulnerabilityAssessment,
    Exploitation,
}

impl PhaseId {
    /// Human-readable phase name
    pub fn display_name(&self) -> &'static str {
        match self {
            PhaseId::Reconnaissance => "Reconnaissance",
            PhaseId::Scanning => "Scanning",
            PhaseId::Enumeration => "Enumeration",
            PhaseId::VulnerabilityAssessment => "Vulnerability Assessment",
            PhaseId::Exploitation => "Exploitation",
        }
    }

    /// Identifier as written in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::Reconnaissance => "reconnaissance",
            PhaseId::Scanning => "scanning",
            PhaseId::Enumeration => "enumeration",
            PhaseId::VulnerabilityAssessment => "vulnerability_assessment",
            PhaseId::Exploitation => "exploitation",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One stage of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub tools: Vec<String>,
}

impl Phase {
    pub fn new<I, S>(id: PhaseId, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }
}

/// One `(phase, tool)` pair in flattened execution order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub phase: PhaseId,
    pub tool: String,
}

impl Step {
    pub fn new(phase: PhaseId, tool: impl Into<String>) -> Self {
        Self {
            phase,
            tool: tool.into(),
        }
    }
}

/// Named assessment template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<Phase>,
}

impl WorkflowTemplate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        phases: Vec<Phase>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            phases,
        }
    }

    /// Sum of tool counts across all phases
    pub fn total_steps(&self) -> usize {
        self.phases.iter().map(|phase| phase.tools.len()).sum()
    }

    /// Flatten phases into the ordered step list
    pub fn steps(&self) -> Vec<Step> {
        self.phases
            .iter()
            .flat_map(|phase| phase.tools.iter().map(move |tool| Step::new(phase.id, tool.clone())))
            .collect()
    }

    /// Distinct tool identifiers, first-seen order
    pub fn tools(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for tool in self.phases.iter().flat_map(|phase| phase.tools.iter()) {
            if !seen.contains(&tool.as_str()) {
                seen.push(tool.as_str());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowTemplate {
        WorkflowTemplate::new(
            "sample",
            "two phases",
            vec![
                Phase::new(PhaseId::Reconnaissance, ["whois", "dig"]),
                Phase::new(PhaseId::Scanning, ["nmap"]),
            ],
        )
    }

    #[test]
    fn test_total_steps_is_sum_of_tools() {
        assert_eq!(sample().total_steps(), 3);
        let empty = WorkflowTemplate::new("empty", "", vec![]);
        assert_eq!(empty.total_steps(), 0);
    }

    #[test]
    fn test_steps_preserve_order_across_phases() {
        let steps = sample().steps();
        assert_eq!(
            steps,
            vec![
                Step::new(PhaseId::Reconnaissance, "whois"),
                Step::new(PhaseId::Reconnaissance, "dig"),
                Step::new(PhaseId::Scanning, "nmap"),
            ]
        );
    }

    #[test]
    fn test_distinct_tools() {
        let template = WorkflowTemplate::new(
            "dup",
            "",
            vec![
                Phase::new(PhaseId::Scanning, ["nmap"]),
                Phase::new(PhaseId::Enumeration, ["nmap", "gobuster"]),
            ],
        );
        assert_eq!(template.tools(), vec!["nmap", "gobuster"]);
    }

    #[test]
    fn test_phase_id_serde_names() {
        let json = serde_json::to_string(&PhaseId::VulnerabilityAssessment).unwrap();
        assert_eq!(json, "\"vulnerability_assessment\"");
        assert_eq!(PhaseId::VulnerabilityAssessment.as_str(), "vulnerability_assessment");
        assert_eq!(PhaseId::Scanning.to_string(), "Scanning");
    }
}
