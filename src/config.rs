use crate::engine::{EngineConfig, RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::tools::process::DEFAULT_MAX_OUTPUT_BYTES;
use crate::tools::registry::DEFAULT_WORDLIST;
use crate::tools::ToolCatalog;
use crate::workflow::{TemplateRegistry, WorkflowTemplate};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub tools: ToolsSection,
    /// User templates, added to the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<WorkflowTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Run retry passes automatically after a run with failures
    pub auto_retry: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: crate::engine::retry::BASE_DELAY_MS,
            retry_max_delay_ms: crate::engine::retry::MAX_DELAY_MS,
            auto_retry: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub wordlist: String,
    pub max_output_bytes: usize,
    /// Ceiling overrides in seconds, by tool id
    pub timeouts: HashMap<String, u64>,
    /// Command line overrides (argv), by tool id
    pub commands: HashMap<String, Vec<String>>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            wordlist: DEFAULT_WORDLIST.to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            timeouts: HashMap::new(),
            commands: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, creating a default file if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".reconchain").join("config.toml"))
    }

    /// Built-in templates plus the user's, which replace built-ins of the same name
    pub fn registry(&self) -> Result<TemplateRegistry> {
        let mut registry = TemplateRegistry::builtin();
        for template in &self.templates {
            registry
                .register(template.clone())
                .with_context(|| format!("Invalid template '{}' in config", template.name))?;
        }
        Ok(registry)
    }

    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::new()
            .with_wordlist(self.tools.wordlist.clone())
            .with_overrides(&self.tools.commands)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            retry: RetryPolicy::new(
                self.engine.max_retries,
                self.engine.retry_base_delay_ms,
                self.engine.retry_max_delay_ms,
            ),
            ceilings: self
                .tools
                .timeouts
                .iter()
                .map(|(tool, secs)| (tool.clone(), Duration::from_secs(*secs)))
                .collect(),
        }
    }
}
