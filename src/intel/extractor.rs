//! Intelligence extraction
//!
//! Turns raw tool output into an [`Intelligence`] map. Extraction is total:
//! unparseable or empty output yields an empty map, never an error.

use crate::intel::store::{keys, Intelligence, OpenPort};
use crate::tools::ToolClass;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Extracts structured intelligence from one tool's raw output
pub trait IntelligenceExtractor: Send + Sync {
    fn extract(&self, tool: &str, payload: &str) -> Intelligence;
}

#[allow(clippy::expect_used)]
static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b")
        .expect("Hardcoded IPv4 regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s\[\]"'<>]+"#).expect("Hardcoded URL regex pattern should be valid")
});

// nmap: "80/tcp   open  http    nginx 1.18.0"
#[allow(clippy::expect_used)]
static NMAP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\d{1,5})/(tcp|udp)\s+open\s+(\S+)")
        .expect("Hardcoded nmap port regex pattern should be valid")
});

// masscan: "Discovered open port 443/tcp on 203.0.113.5"
#[allow(clippy::expect_used)]
static MASSCAN_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Discovered open port (\d{1,5})/(tcp|udp) on (\S+)")
        .expect("Hardcoded masscan port regex pattern should be valid")
});

// naabu / rustscan greppable: "example.com:443"
#[allow(clippy::expect_used)]
static HOST_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([A-Za-z0-9.\-]+):(\d{1,5})\s*$")
        .expect("Hardcoded host:port regex pattern should be valid")
});

// gobuster: "/admin (Status: 301) [Size: 178]"
#[allow(clippy::expect_used)]
static GOBUSTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(/\S*)\s+\(Status:\s*(\d{3})\)")
        .expect("Hardcoded gobuster regex pattern should be valid")
});

// ffuf: "admin    [Status: 301, Size: 178, ...]"
#[allow(clippy::expect_used)]
static FFUF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\S+)\s+\[Status:\s*(\d{3})")
        .expect("Hardcoded ffuf regex pattern should be valid")
});

// dirb: "+ http://example.com/admin (CODE:301|SIZE:178)"
#[allow(clippy::expect_used)]
static DIRB_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\+\s+(https?://\S+)\s+\(CODE:(\d{3})")
        .expect("Hardcoded dirb regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static HOSTNAME_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*((?:[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63})\.?\s*$")
        .expect("Hardcoded hostname regex pattern should be valid")
});

// whatweb: "Apache[2.4.41]"
#[allow(clippy::expect_used)]
static TECHNOLOGY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9\-_.]*)\[([^\]]*)\]")
        .expect("Hardcoded technology regex pattern should be valid")
});

// dig: "example.com.  300  IN  A  203.0.113.5"
#[allow(clippy::expect_used)]
static A_RECORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\sIN\s+A\s+\d").expect("Hardcoded A record regex pattern should be valid")
});

/// WhatWeb plugins that describe the response rather than the stack
const NON_TECHNOLOGY_PLUGINS: [&str; 6] = [
    "Country",
    "IP",
    "Title",
    "Email",
    "UncommonHeaders",
    "RedirectLocation",
];

/// whois fields holding network bounds rather than host addresses
const RANGE_FIELDS: [&str; 5] = ["netrange:", "inetnum:", "cidr:", "route:", "netblock:"];

/// Regex-based extractor covering the catalog's standard tools
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl IntelligenceExtractor for PatternExtractor {
    fn extract(&self, tool: &str, payload: &str) -> Intelligence {
        let mut intel = Intelligence::new();
        if payload.trim().is_empty() {
            return intel;
        }

        match ToolClass::of(tool) {
            ToolClass::Lookup => {
                insert_strings(&mut intel, keys::ADDRESSES, lookup_addresses(payload));
            }
            ToolClass::SubdomainEnum => {
                insert_strings(&mut intel, keys::SUBDOMAINS, hostnames(payload));
            }
            ToolClass::PortScan => {
                insert_ports(&mut intel, open_ports(payload));
                insert_strings(&mut intel, keys::ADDRESSES, addresses(payload));
            }
            ToolClass::HttpProbe => {
                insert_strings(&mut intel, keys::WEB_ENDPOINTS, urls(payload));
            }
            ToolClass::WebFingerprint => {
                insert_strings(&mut intel, keys::WEB_ENDPOINTS, urls(payload));
                insert_strings(&mut intel, keys::TECHNOLOGIES, technologies(payload));
            }
            ToolClass::DirectoryEnum => {
                insert_strings(&mut intel, keys::DIRECTORIES, directories(payload));
            }
            ToolClass::WebVulnScan | ToolClass::InjectionTest | ToolClass::TlsScan => {
                insert_strings(&mut intel, keys::FINDINGS, findings(payload));
            }
            ToolClass::Exploitation | ToolClass::Generic => {
                insert_strings(&mut intel, keys::ADDRESSES, addresses(payload));
                insert_strings(&mut intel, keys::WEB_ENDPOINTS, urls(payload));
            }
        }

        intel
    }
}

fn insert_strings(intel: &mut Intelligence, key: &str, values: Vec<String>) {
    if !values.is_empty() {
        intel.insert(
            key.to_string(),
            Value::Array(values.into_iter().map(Value::String).collect()),
        );
    }
}

fn insert_ports(intel: &mut Intelligence, ports: Vec<OpenPort>) {
    let values: Vec<Value> = ports
        .into_iter()
        .filter_map(|port| serde_json::to_value(port).ok())
        .collect();
    if !values.is_empty() {
        intel.insert(keys::OPEN_PORTS.to_string(), Value::Array(values));
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn addresses(payload: &str) -> Vec<String> {
    let mut found = Vec::new();
    for m in IPV4_REGEX.find_iter(payload) {
        push_unique(&mut found, m.as_str().to_string());
    }
    found
}

/// Addresses from lookup output, host records ahead of network bounds
fn lookup_addresses(payload: &str) -> Vec<String> {
    let mut ranked: Vec<(u8, &str)> = Vec::new();
    for line in payload.lines() {
        let rank = lookup_line_rank(line);
        for m in IPV4_REGEX.find_iter(line) {
            ranked.push((rank, m.as_str()));
        }
    }
    ranked.sort_by_key(|(rank, _)| *rank);

    let mut found = Vec::new();
    for (_, address) in ranked {
        push_unique(&mut found, address.to_string());
    }
    found
}

fn lookup_line_rank(line: &str) -> u8 {
    let trimmed = line.trim();
    let lower = trimmed.to_ascii_lowercase();

    if RANGE_FIELDS.iter().any(|field| lower.starts_with(field)) {
        2
    } else if lower.starts_with("address:")
        || lower.contains("has address")
        || A_RECORD_REGEX.is_match(line)
        || IPV4_REGEX.find(trimmed).map_or(false, |m| m.as_str() == trimmed)
    {
        0
    } else {
        1
    }
}

fn urls(payload: &str) -> Vec<String> {
    let mut found = Vec::new();
    for m in URL_REGEX.find_iter(payload) {
        let url = m.as_str().trim_end_matches(&['.', ',', ';', ')'][..]);
        push_unique(&mut found, url.to_string());
    }
    found
}

fn hostnames(payload: &str) -> Vec<String> {
    let mut found = Vec::new();
    for caps in HOSTNAME_LINE_REGEX.captures_iter(payload) {
        push_unique(&mut found, caps[1].to_ascii_lowercase());
    }
    found
}

fn open_ports(payload: &str) -> Vec<OpenPort> {
    let mut ports: Vec<OpenPort> = Vec::new();
    let mut push = |port: OpenPort| {
        if !ports.iter().any(|p| p.port == port.port && p.protocol == port.protocol) {
            ports.push(port);
        }
    };

    for caps in NMAP_PORT_REGEX.captures_iter(payload) {
        if let Ok(port) = caps[1].parse::<u16>() {
            push(OpenPort::new(port, &caps[2], &caps[3]));
        }
    }
    for caps in MASSCAN_PORT_REGEX.captures_iter(payload) {
        if let Ok(port) = caps[1].parse::<u16>() {
            push(OpenPort::new(port, &caps[2], ""));
        }
    }
    for caps in HOST_PORT_REGEX.captures_iter(payload) {
        if let Ok(port) = caps[2].parse::<u16>() {
            push(OpenPort::new(port, "tcp", ""));
        }
    }

    ports
}

fn directories(payload: &str) -> Vec<String> {
    let mut found = Vec::new();
    let interesting = |status: &str| status != "404";

    for caps in GOBUSTER_REGEX.captures_iter(payload) {
        if interesting(&caps[2]) {
            push_unique(&mut found, caps[1].to_string());
        }
    }
    for caps in FFUF_REGEX.captures_iter(payload) {
        if interesting(&caps[2]) {
            let path = format!("/{}", caps[1].trim_start_matches('/'));
            push_unique(&mut found, path);
        }
    }
    for caps in DIRB_REGEX.captures_iter(payload) {
        if interesting(&caps[2]) {
            push_unique(&mut found, caps[1].to_string());
        }
    }

    found
}

fn technologies(payload: &str) -> Vec<String> {
    let mut found = Vec::new();
    for caps in TECHNOLOGY_REGEX.captures_iter(payload) {
        let name = &caps[1];
        if NON_TECHNOLOGY_PLUGINS.contains(&name) || name.starts_with("http") {
            continue;
        }
        let detail = caps[2].trim();
        let entry = if detail.is_empty() || detail.contains(' ') {
            name.to_string()
        } else {
            format!("{} {}", name, detail)
        };
        push_unique(&mut found, entry);
    }
    found
}

fn findings(payload: &str) -> Vec<String> {
    let mut found = Vec::new();

    for line in payload.lines().map(str::trim) {
        let is_finding = if let Some(rest) = line.strip_prefix("+ ") {
            // nikto, minus its banner lines
            !["Target", "Start Time", "End Time", "Server:", "No web server", "1 host"]
                .iter()
                .any(|banner| rest.starts_with(banner))
                && !rest.contains("item(s) reported")
        } else if line.starts_with('[') {
            // nuclei: "[template-id] [http] [severity] url"
            line.matches("] [").count() >= 2
        } else {
            let lower = line.to_ascii_lowercase();
            let legacy_protocol =
                lower.contains("sslv2") || lower.contains("sslv3") || lower.contains("tlsv1.0");
            (lower.contains("vulnerable") && !lower.contains("not vulnerable"))
                || lower.contains("is injectable")
                || (lower.contains("enabled") && legacy_protocol)
        };

        if is_finding {
            push_unique(&mut found, line.to_string());
        }
    }

    found
}
