//! Tool classification
//!
//! Every tool identifier maps to a class. The class decides the default time
//! ceiling, which extraction patterns apply to its output and where it looks
//! for handoff data from earlier steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tool class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    /// Ownership and DNS lookups
    Lookup,
    SubdomainEnum,
    PortScan,
    /// Live HTTP service detection
    HttpProbe,
    WebFingerprint,
    DirectoryEnum,
    WebVulnScan,
    InjectionTest,
    TlsScan,
    Exploitation,
    Generic,
}

impl ToolClass {
    /// Classify a tool identifier (case-insensitive)
    pub fn of(tool: &str) -> ToolClass {
        match tool.trim().to_ascii_lowercase().as_str() {
            "whois" | "dig" | "host" | "nslookup" | "dnsrecon" | "dnsenum" => ToolClass::Lookup,
            "subfinder" | "amass" | "sublist3r" | "assetfinder" => ToolClass::SubdomainEnum,
            "nmap" | "masscan" | "rustscan" | "naabu" | "portscan" => ToolClass::PortScan,
            "httpx" | "httprobe" => ToolClass::HttpProbe,
            "whatweb" | "wafw00f" => ToolClass::WebFingerprint,
            "gobuster" | "ffuf" | "dirb" | "dirsearch" | "feroxbuster" => ToolClass::DirectoryEnum,
            "nikto" | "nuclei" | "wpscan" => ToolClass::WebVulnScan,
            "sqlmap" | "commix" => ToolClass::InjectionTest,
            "sslscan" | "testssl" | "sslyze" => ToolClass::TlsScan,
            "hydra" | "searchsploit" | "msfconsole" => ToolClass::Exploitation,
            _ => ToolClass::Generic,
        }
    }

    /// Default time ceiling for one invocation
    pub fn default_ceiling(&self) -> Duration {
        let secs = match self {
            ToolClass::Lookup => 30,
            ToolClass::WebFingerprint => 60,
            ToolClass::HttpProbe => 120,
            ToolClass::TlsScan => 180,
            ToolClass::SubdomainEnum => 300,
            ToolClass::Generic => 300,
            ToolClass::DirectoryEnum => 600,
            ToolClass::Exploitation => 600,
            ToolClass::PortScan => 900,
            ToolClass::InjectionTest => 1200,
            ToolClass::WebVulnScan => 1800,
        };
        Duration::from_secs(secs)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolClass::Lookup => "lookup",
            ToolClass::SubdomainEnum => "subdomain_enum",
            ToolClass::PortScan => "port_scan",
            ToolClass::HttpProbe => "http_probe",
            ToolClass::WebFingerprint => "web_fingerprint",
            ToolClass::DirectoryEnum => "directory_enum",
            ToolClass::WebVulnScan => "web_vuln_scan",
            ToolClass::InjectionTest => "injection_test",
            ToolClass::TlsScan => "tls_scan",
            ToolClass::Exploitation => "exploitation",
            ToolClass::Generic => "generic",
        }
    }
}

impl fmt::Display for ToolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(ToolClass::of("whois"), ToolClass::Lookup);
        assert_eq!(ToolClass::of("NMAP"), ToolClass::PortScan);
        assert_eq!(ToolClass::of("portscan"), ToolClass::PortScan);
        assert_eq!(ToolClass::of("httpx"), ToolClass::HttpProbe);
        assert_eq!(ToolClass::of("gobuster"), ToolClass::DirectoryEnum);
        assert_eq!(ToolClass::of("sqlmap"), ToolClass::InjectionTest);
        assert_eq!(ToolClass::of("custom-thing"), ToolClass::Generic);
    }

    #[test]
    fn test_ceilings_fast_lookups_and_broad_scans() {
        let lookup = ToolClass::Lookup.default_ceiling();
        assert!(lookup >= Duration::from_secs(15) && lookup <= Duration::from_secs(60));

        for broad in [ToolClass::PortScan, ToolClass::WebVulnScan, ToolClass::DirectoryEnum] {
            let ceiling = broad.default_ceiling();
            assert!(ceiling >= Duration::from_secs(5 * 60), "{}", broad);
            assert!(ceiling <= Duration::from_secs(30 * 60), "{}", broad);
        }
    }
}
