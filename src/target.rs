//! Target string helpers
//!
//! Targets are plain strings: a domain, an address, `host:port` or a URL.
//! Tools want different shapes of the same target, so these helpers derive
//! them without ever failing.

/// Host part of a target (`https://a.example.com:8443/x` → `a.example.com`)
pub fn host_of(target: &str) -> &str {
    let trimmed = target.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let authority = authority.rsplit_once('@').map(|(_, host)| host).unwrap_or(authority);

    // Bracketed IPv6 keeps its colons
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => authority,
    }
}

/// Target as a URL, defaulting to `http://` when no scheme is present
pub fn url_of(target: &str) -> String {
    let trimmed = target.trim();
    if trimmed.contains("://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}

/// Join a discovered path onto a base target unless it is already absolute
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim();
    if path.contains("://") {
        return path.to_string();
    }
    format!("{}/{}", url_of(base), path.trim_start_matches('/'))
}
