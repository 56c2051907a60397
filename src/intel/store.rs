//! Intelligence store
//!
//! Per-tool extracted data, overwritten when a tool runs again. The engine is
//! the only writer; everyone else reads snapshots.

use crate::intel::handoff::{self, Resolution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Structured data extracted from one tool's output
pub type Intelligence = serde_json::Map<String, Value>;

/// Well-known intelligence keys
pub mod keys {
    pub const ADDRESSES: &str = "addresses";
    pub const SUBDOMAINS: &str = "subdomains";
    /// Array of [`OpenPort`](super::OpenPort) objects
    pub const OPEN_PORTS: &str = "open_ports";
    pub const WEB_ENDPOINTS: &str = "web_endpoints";
    pub const DIRECTORIES: &str = "directories";
    pub const TECHNOLOGIES: &str = "technologies";
    pub const FINDINGS: &str = "findings";
}

/// Ports served over HTTP(S) by convention
const WEB_PORTS: [u16; 6] = [80, 443, 8000, 8080, 8443, 8888];
const HTTPS_PORTS: [u16; 2] = [443, 8443];

/// Open port entry stored under `open_ports`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub service: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

impl OpenPort {
    pub fn new(port: u16, protocol: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            port,
            protocol: protocol.into(),
            service: service.into(),
        }
    }

    /// TCP port that serves HTTP(S)
    pub fn is_web(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("tcp")
            && (self.service.to_ascii_lowercase().contains("http")
                || WEB_PORTS.contains(&self.port))
    }

    /// Web port that speaks TLS
    pub fn is_https(&self) -> bool {
        let service = self.service.to_ascii_lowercase();
        self.is_web()
            && (service.contains("https")
                || service.contains("ssl")
                || HTTPS_PORTS.contains(&self.port))
    }

    pub fn scheme(&self) -> &'static str {
        if self.is_https() {
            "https"
        } else {
            "http"
        }
    }
}

/// Intelligence produced by one successful tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceRecord {
    pub tool: String,
    /// Target the tool ran against, when known
    pub target: Option<String>,
    pub data: Intelligence,
    /// Store-wide write order
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
}

impl IntelligenceRecord {
    /// String values under `key`, skipping blanks and non-strings
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parsed `open_ports` entries, skipping malformed ones
    pub fn open_ports(&self) -> Vec<OpenPort> {
        self.data
            .get(keys::OPEN_PORTS)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| serde_json::from_value::<OpenPort>(value.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of items per key, for handoff summaries
    pub fn summary(&self) -> Vec<(String, usize)> {
        let mut summary: Vec<(String, usize)> = self
            .data
            .iter()
            .map(|(key, value)| {
                let count = match value {
                    Value::Array(items) => items.len(),
                    Value::Null => 0,
                    _ => 1,
                };
                (key.clone(), count)
            })
            .collect();
        summary.sort();
        summary
    }
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, IntelligenceRecord>,
    next_sequence: u64,
}

/// Shared intelligence store handle
#[derive(Clone, Default)]
pub struct IntelligenceStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl IntelligenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` for `tool`, replacing any earlier record
    pub fn record(&self, tool: &str, data: Intelligence) -> IntelligenceRecord {
        self.write_record(tool, None, data)
    }

    /// Store `data` for `tool` along with the target it ran against
    pub fn record_for_target(
        &self,
        tool: &str,
        target: &str,
        data: Intelligence,
    ) -> IntelligenceRecord {
        self.write_record(tool, Some(target.to_string()), data)
    }

    fn write_record(
        &self,
        tool: &str,
        target: Option<String>,
        data: Intelligence,
    ) -> IntelligenceRecord {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.next_sequence += 1;

        let record = IntelligenceRecord {
            tool: tool.to_string(),
            target,
            data,
            sequence: inner.next_sequence,
            recorded_at: Utc::now(),
        };
        inner.records.insert(tool.to_string(), record.clone());
        record
    }

    pub fn get(&self, tool: &str) -> Option<IntelligenceRecord> {
        self.read(|inner| inner.records.get(tool).cloned())
    }

    /// Copy of every record keyed by tool
    pub fn snapshot(&self) -> HashMap<String, IntelligenceRecord> {
        self.read(|inner| inner.records.clone())
    }

    /// Every record, most recently written first
    pub fn records_newest_first(&self) -> Vec<IntelligenceRecord> {
        let mut records: Vec<IntelligenceRecord> =
            self.read(|inner| inner.records.values().cloned().collect());
        records.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        records
    }

    /// Input target for `tool`, falling back to `fallback`
    pub fn resolve_target_for(&self, tool: &str, fallback: &str) -> String {
        self.resolve(tool, fallback).target
    }

    /// Like [`resolve_target_for`](Self::resolve_target_for), keeping provenance
    pub fn resolve(&self, tool: &str, fallback: &str) -> Resolution {
        handoff::resolve(&self.records_newest_first(), tool, fallback)
    }

    pub fn len(&self) -> usize {
        self.read(|inner| inner.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record (new assessment target)
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.records.clear();
    }

    fn read<T>(&self, view: impl FnOnce(&StoreInner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        view(&inner)
    }
}

impl std::fmt::Debug for IntelligenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntelligenceStore")
            .field("records", &self.len())
            .finish()
    }
}
