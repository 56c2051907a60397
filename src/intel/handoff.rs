//! Handoff resolution
//!
//! Decides which target a tool runs against from what earlier tools found.
//! Each tool class has a fixed priority chain of sources; each source reads
//! records written by one producer class. Records are consulted newest
//! first and the first usable value wins. Nothing found means the fallback
//! target; resolution never fails.

use crate::intel::store::{keys, IntelligenceRecord};
use crate::target::{host_of, join_url};
use crate::tools::ToolClass;
use serde::{Deserialize, Serialize};

/// Where a handoff value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffSource {
    /// First address from a lookup record
    Address,
    /// First endpoint from an HTTP detection record
    WebEndpoint,
    /// First open web port from a port scan, as a URL
    WebPort,
    /// First open TLS web port from a port scan, as `host:port`
    HttpsPort,
    /// First discovered directory, joined onto its base URL
    Directory,
}

impl HandoffSource {
    /// Class whose records this source reads
    pub fn producer(&self) -> ToolClass {
        match self {
            HandoffSource::Address => ToolClass::Lookup,
            HandoffSource::WebEndpoint => ToolClass::HttpProbe,
            HandoffSource::WebPort | HandoffSource::HttpsPort => ToolClass::PortScan,
            HandoffSource::Directory => ToolClass::DirectoryEnum,
        }
    }

    fn value_from(&self, record: &IntelligenceRecord, fallback: &str) -> Option<String> {
        let base = record.target.as_deref().unwrap_or(fallback);

        match self {
            HandoffSource::Address => record.strings(keys::ADDRESSES).into_iter().next(),
            HandoffSource::WebEndpoint => record.strings(keys::WEB_ENDPOINTS).into_iter().next(),
            HandoffSource::WebPort => record
                .open_ports()
                .into_iter()
                .find(|port| port.is_web())
                .map(|port| format!("{}://{}:{}", port.scheme(), host_of(base), port.port)),
            HandoffSource::HttpsPort => record
                .open_ports()
                .into_iter()
                .find(|port| port.is_https())
                .map(|port| format!("{}:{}", host_of(base), port.port)),
            HandoffSource::Directory => record
                .strings(keys::DIRECTORIES)
                .into_iter()
                .next()
                .map(|path| join_url(base, &path)),
        }
    }
}

/// Priority chain for a tool class, highest priority first
pub fn chain_for(class: ToolClass) -> &'static [HandoffSource] {
    use HandoffSource::*;

    match class {
        ToolClass::Lookup | ToolClass::SubdomainEnum | ToolClass::Generic => &[],
        ToolClass::PortScan => &[Address],
        ToolClass::HttpProbe => &[WebPort],
        ToolClass::WebFingerprint | ToolClass::DirectoryEnum | ToolClass::WebVulnScan => {
            &[WebEndpoint, WebPort]
        }
        ToolClass::InjectionTest => &[Directory, WebEndpoint, WebPort],
        ToolClass::TlsScan => &[HttpsPort],
        ToolClass::Exploitation => &[Address],
    }
}

/// Outcome of resolving one tool's input target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub target: String,
    /// Tool whose record supplied the target
    pub source_tool: Option<String>,
    pub source: Option<HandoffSource>,
}

impl Resolution {
    pub fn fallback(target: &str) -> Self {
        Self {
            target: target.to_string(),
            source_tool: None,
            source: None,
        }
    }

    /// Target came from an earlier tool rather than the fallback
    pub fn is_handoff(&self) -> bool {
        self.source_tool.is_some()
    }
}

/// Resolve `tool`'s target from `records` (newest first)
pub fn resolve(records: &[IntelligenceRecord], tool: &str, fallback: &str) -> Resolution {
    for source in chain_for(ToolClass::of(tool)) {
        let producer = source.producer();
        let hit = records
            .iter()
            .filter(|record| ToolClass::of(&record.tool) == producer)
            .find_map(|record| {
                source
                    .value_from(record, fallback)
                    .map(|target| (target, record.tool.clone()))
            });

        if let Some((target, source_tool)) = hit {
            return Resolution {
                target,
                source_tool: Some(source_tool),
                source: Some(*source),
            };
        }
    }

    Resolution::fallback(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::store::{Intelligence, IntelligenceStore};
    use serde_json::{json, Value};

    fn intel(value: Value) -> Intelligence {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_port_scan_prefers_lookup_address() {
        let store = IntelligenceStore::new();
        store.record("whois", intel(json!({"addresses": ["203.0.113.5"]})));

        let resolution = store.resolve("portscan", "example.com");
        assert_eq!(resolution.target, "203.0.113.5");
        assert_eq!(resolution.source_tool.as_deref(), Some("whois"));
        assert_eq!(resolution.source, Some(HandoffSource::Address));
    }

    #[test]
    fn test_lookup_tools_never_hand_off() {
        let store = IntelligenceStore::new();
        store.record("dig", intel(json!({"addresses": ["203.0.113.5"]})));

        let resolution = store.resolve("whois", "example.com");
        assert_eq!(resolution, Resolution::fallback("example.com"));
        assert!(!resolution.is_handoff());
    }

    #[test]
    fn test_most_recent_record_wins() {
        let store = IntelligenceStore::new();
        store.record("whois", intel(json!({"addresses": ["198.51.100.7"]})));
        store.record("dig", intel(json!({"addresses": ["203.0.113.5"]})));

        assert_eq!(store.resolve_target_for("nmap", "example.com"), "203.0.113.5");
    }

    #[test]
    fn test_empty_newer_record_does_not_shadow_older_value() {
        let store = IntelligenceStore::new();
        store.record("whois", intel(json!({"addresses": ["198.51.100.7"]})));
        store.record("dig", intel(json!({"addresses": []})));

        assert_eq!(store.resolve_target_for("nmap", "example.com"), "198.51.100.7");
    }

    #[test]
    fn test_directory_enum_priority_chain() {
        let store = IntelligenceStore::new();

        // Nothing yet
        assert_eq!(store.resolve_target_for("gobuster", "example.com"), "example.com");

        // Port scan only: first web port
        store.record_for_target(
            "nmap",
            "203.0.113.5",
            intel(json!({"open_ports": [
                {"port": 22, "protocol": "tcp", "service": "ssh"},
                {"port": 8080, "protocol": "tcp", "service": "http-proxy"}
            ]})),
        );
        assert_eq!(store.resolve_target_for("gobuster", "example.com"), "http://203.0.113.5:8080");

        // HTTP detection beats port scan even though it is older in the chain
        store.record("httpx", intel(json!({"web_endpoints": ["https://www.example.com"]})));
        let resolution = store.resolve("gobuster", "example.com");
        assert_eq!(resolution.target, "https://www.example.com");
        assert_eq!(resolution.source, Some(HandoffSource::WebEndpoint));
    }

    #[test]
    fn test_web_port_uses_fallback_host_without_record_target() {
        let store = IntelligenceStore::new();
        store.record("nmap", intel(json!({"open_ports": [{"port": 443, "service": "https"}]})));

        assert_eq!(store.resolve_target_for("nikto", "example.com"), "https://example.com:443");
        assert_eq!(store.resolve_target_for("httpx", "example.com"), "https://example.com:443");
    }

    #[test]
    fn test_injection_prefers_directories() {
        let store = IntelligenceStore::new();
        store.record("httpx", intel(json!({"web_endpoints": ["http://example.com"]})));
        store.record_for_target(
            "gobuster",
            "http://example.com:8080",
            intel(json!({"directories": ["/login.php", "/admin"]})),
        );

        let resolution = store.resolve("sqlmap", "example.com");
        assert_eq!(resolution.target, "http://example.com:8080/login.php");
        assert_eq!(resolution.source, Some(HandoffSource::Directory));
    }

    #[test]
    fn test_tls_scan_uses_https_port_only() {
        let store = IntelligenceStore::new();
        store.record_for_target(
            "nmap",
            "example.com",
            intel(json!({"open_ports": [
                {"port": 80, "service": "http"},
                {"port": 8443, "service": "https-alt"}
            ]})),
        );

        assert_eq!(store.resolve_target_for("sslscan", "fallback.test"), "example.com:8443");

        let plain = IntelligenceStore::new();
        plain.record("nmap", intel(json!({"open_ports": [{"port": 80, "service": "http"}]})));
        assert_eq!(plain.resolve_target_for("sslscan", "fallback.test"), "fallback.test");
    }

    #[test]
    fn test_records_from_other_classes_ignored() {
        let store = IntelligenceStore::new();
        // Addresses from a port scan are not a lookup source
        store.record("nmap", intel(json!({"addresses": ["203.0.113.5"]})));
        assert_eq!(store.resolve_target_for("masscan", "example.com"), "example.com");
    }

    #[test]
    fn test_chain_table() {
        assert!(chain_for(ToolClass::Lookup).is_empty());
        assert_eq!(chain_for(ToolClass::PortScan), &[HandoffSource::Address]);
        assert_eq!(
            chain_for(ToolClass::DirectoryEnum),
            &[HandoffSource::WebEndpoint, HandoffSource::WebPort]
        );
        assert_eq!(
            chain_for(ToolClass::InjectionTest),
            &[HandoffSource::Directory, HandoffSource::WebEndpoint, HandoffSource::WebPort]
        );
    }
}
