//! Workflow template registry
//!
//! Static, read-only map of template name to template, built once at startup.
//!
//! Built-in templates:
//! - quick-recon: ownership lookup, DNS, service scan
//! - web-application: recon through web vulnerability scanning
//! - network-infrastructure: host discovery, port and TLS review
//! - full-assessment: every phase, every standard tool

use crate::errors::{ReconError, Result};
use crate::workflow::types::{Phase, PhaseId, WorkflowTemplate};
use std::collections::HashMap;
use std::sync::Arc;

/// Template registry
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    /// Map of template name to template
    templates: HashMap<String, Arc<WorkflowTemplate>>,
}

impl TemplateRegistry {
    /// Create registry with all built-in templates
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        for template in builtin_templates() {
            registry.insert(template);
        }

        registry
    }

    /// Create registry with no templates
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Validate and register a template, replacing any with the same name
    pub fn register(&mut self, template: WorkflowTemplate) -> Result<()> {
        validate(&template)?;
        self.insert(template);
        Ok(())
    }

    fn insert(&mut self, template: WorkflowTemplate) {
        self.templates
            .insert(template.name.clone(), Arc::new(template));
    }

    /// Get template by name
    pub fn get(&self, name: &str) -> Option<Arc<WorkflowTemplate>> {
        self.templates.get(name).cloned()
    }

    /// Get template by name or fail with `UnknownTemplate`
    pub fn require(&self, name: &str) -> Result<Arc<WorkflowTemplate>> {
        self.get(name)
            .ok_or_else(|| ReconError::UnknownTemplate(name.to_string()))
    }

    /// Check if template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Sorted template names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Templates sorted by name
    pub fn templates(&self) -> Vec<Arc<WorkflowTemplate>> {
        self.names()
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn validate(template: &WorkflowTemplate) -> Result<()> {
    let invalid = |reason: &str| ReconError::InvalidTemplate {
        name: template.name.clone(),
        reason: reason.to_string(),
    };

    if template.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if template.phases.is_empty() {
        return Err(invalid("template has no phases"));
    }
    if let Some(phase) = template.phases.iter().find(|phase| phase.tools.is_empty()) {
        return Err(invalid(&format!("phase '{}' has no tools", phase.id.as_str())));
    }
    if template
        .phases
        .iter()
        .flat_map(|phase| phase.tools.iter())
        .any(|tool| tool.trim().is_empty())
    {
        return Err(invalid("tool identifiers must not be empty"));
    }

    Ok(())
}

fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate::new(
            "quick-recon",
            "Ownership and DNS lookup followed by a service scan",
            vec![
                Phase::new(PhaseId::Reconnaissance, ["whois", "dig"]),
                Phase::new(PhaseId::Scanning, ["nmap"]),
            ],
        ),
        WorkflowTemplate::new(
            "web-application",
            "Web-focused assessment from discovery to vulnerability scanning",
            vec![
                Phase::new(PhaseId::Reconnaissance, ["whois", "dig", "subfinder"]),
                Phase::new(PhaseId::Scanning, ["nmap", "httpx"]),
                Phase::new(PhaseId::Enumeration, ["whatweb", "gobuster"]),
                Phase::new(PhaseId::VulnerabilityAssessment, ["nikto", "nuclei"]),
            ],
        ),
        WorkflowTemplate::new(
            "network-infrastructure",
            "Host discovery, port survey and TLS review",
            vec![
                Phase::new(PhaseId::Reconnaissance, ["whois", "dig", "dnsrecon"]),
                Phase::new(PhaseId::Scanning, ["masscan", "nmap"]),
                Phase::new(PhaseId::Enumeration, ["sslscan"]),
                Phase::new(PhaseId::VulnerabilityAssessment, ["nuclei"]),
            ],
        ),
        WorkflowTemplate::new(
            "full-assessment",
            "Every phase with the standard tool set",
            vec![
                Phase::new(PhaseId::Reconnaissance, ["whois", "dig", "subfinder", "amass"]),
                Phase::new(PhaseId::Scanning, ["nmap", "httpx"]),
                Phase::new(PhaseId::Enumeration, ["whatweb", "gobuster", "sslscan"]),
                Phase::new(PhaseId::VulnerabilityAssessment, ["nikto", "nuclei", "sqlmap"]),
                Phase::new(PhaseId::Exploitation, ["searchsploit"]),
            ],
        ),
    ]
}
