//! Tool catalog
//!
//! Maps tool identifiers to the command line that runs them. Arguments may
//! contain placeholders, substituted per invocation:
//! - `{target}`: resolved target as given
//! - `{host}`: host part of the target
//! - `{url}`: target as a URL (`http://` when no scheme)
//! - `{wordlist}`: configured wordlist path

use crate::target::{host_of, url_of};
use crate::tools::class::ToolClass;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default wordlist for directory enumeration
pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";

/// Command definition for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Program followed by arguments
    pub argv: Vec<String>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, argv: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            argv: argv.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn class(&self) -> ToolClass {
        ToolClass::of(&self.name)
    }

    /// Substitute placeholders and return program plus arguments
    pub fn render(&self, target: &str, wordlist: &str) -> Vec<String> {
        let host = host_of(target);
        let url = url_of(target);
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{target}", target.trim())
                    .replace("{host}", host)
                    .replace("{url}", &url)
                    .replace("{wordlist}", wordlist)
            })
            .collect()
    }
}

/// Tool catalog
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    /// Map of tool name to spec
    tools: HashMap<String, ToolSpec>,
    wordlist: String,
}

impl ToolCatalog {
    /// Create catalog with the standard recon tools
    pub fn new() -> Self {
        let mut catalog = Self {
            tools: HashMap::new(),
            wordlist: DEFAULT_WORDLIST.to_string(),
        };

        for spec in builtin_specs() {
            catalog.insert(spec);
        }

        catalog
    }

    /// Replace or add commands from configuration (`tool -> argv`)
    pub fn with_overrides(mut self, commands: &HashMap<String, Vec<String>>) -> Self {
        for (name, argv) in commands {
            if argv.is_empty() {
                continue;
            }
            let description = self
                .tools
                .get(name)
                .map(|spec| spec.description.clone())
                .unwrap_or_else(|| "Configured tool".to_string());
            self.insert(ToolSpec {
                name: name.clone(),
                description,
                argv: argv.clone(),
            });
        }
        self
    }

    pub fn with_wordlist(mut self, wordlist: impl Into<String>) -> Self {
        self.wordlist = wordlist.into();
        self
    }

    pub fn insert(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Rendered command line for `tool` against `target`
    pub fn command_for(&self, tool: &str, target: &str) -> Option<Vec<String>> {
        self.get(tool).map(|spec| spec.render(target, &self.wordlist))
    }

    /// Sorted tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Specs sorted by name
    pub fn specs(&self) -> Vec<&ToolSpec> {
        let mut specs: Vec<&ToolSpec> = self.tools.values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn wordlist(&self) -> &str {
        &self.wordlist
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new("whois", "Domain and address ownership lookup", &["whois", "{host}"]),
        ToolSpec::new("dig", "DNS address records", &["dig", "+short", "{host}"]),
        ToolSpec::new("host", "DNS lookup", &["host", "{host}"]),
        ToolSpec::new("nslookup", "DNS lookup", &["nslookup", "{host}"]),
        ToolSpec::new("dnsrecon", "DNS enumeration", &["dnsrecon", "-d", "{host}"]),
        ToolSpec::new(
            "subfinder",
            "Passive subdomain discovery",
            &["subfinder", "-silent", "-d", "{host}"],
        ),
        ToolSpec::new(
            "amass",
            "Subdomain enumeration",
            &["amass", "enum", "-passive", "-d", "{host}"],
        ),
        ToolSpec::new(
            "assetfinder",
            "Subdomain discovery",
            &["assetfinder", "--subs-only", "{host}"],
        ),
        ToolSpec::new(
            "nmap",
            "Service and version scan",
            &["nmap", "-sV", "-T4", "--top-ports", "1000", "{host}"],
        ),
        ToolSpec::new(
            "masscan",
            "Fast full port sweep",
            &["masscan", "-p1-65535", "--rate", "1000", "{host}"],
        ),
        ToolSpec::new("naabu", "Port discovery", &["naabu", "-silent", "-host", "{host}"]),
        ToolSpec::new(
            "httpx",
            "Live HTTP service detection",
            &["httpx", "-silent", "-status-code", "-title", "-u", "{target}"],
        ),
        ToolSpec::new(
            "whatweb",
            "Web technology fingerprint",
            &["whatweb", "--color=never", "{url}"],
        ),
        ToolSpec::new("wafw00f", "Web application firewall detection", &["wafw00f", "{url}"]),
        ToolSpec::new(
            "gobuster",
            "Directory brute force",
            &["gobuster", "dir", "-q", "-u", "{url}", "-w", "{wordlist}"],
        ),
        ToolSpec::new(
            "ffuf",
            "Web fuzzer",
            &["ffuf", "-s", "-u", "{url}/FUZZ", "-w", "{wordlist}"],
        ),
        ToolSpec::new("dirb", "Directory brute force", &["dirb", "{url}", "{wordlist}", "-S"]),
        ToolSpec::new("nikto", "Web server scanner", &["nikto", "-h", "{url}"]),
        ToolSpec::new(
            "nuclei",
            "Template-based vulnerability scanner",
            &["nuclei", "-silent", "-u", "{url}"],
        ),
        ToolSpec::new("wpscan", "WordPress scanner", &["wpscan", "--url", "{url}", "--no-banner"]),
        ToolSpec::new(
            "sqlmap",
            "SQL injection testing",
            &["sqlmap", "-u", "{url}", "--batch", "--crawl=1"],
        ),
        ToolSpec::new(
            "sslscan",
            "TLS configuration review",
            &["sslscan", "--no-colour", "{target}"],
        ),
        ToolSpec::new("testssl", "TLS configuration review", &["testssl", "--quiet", "{target}"]),
        ToolSpec::new(
            "searchsploit",
            "Exploit database search",
            &["searchsploit", "--disable-colour", "{host}"],
        ),
    ]
}
