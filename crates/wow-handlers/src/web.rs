//! WebFetch and WebSearch validation.
//!
//! Hosts are inspected literally; the gateway never resolves names, because
//! resolving attacker-controlled input would itself be network traffic. The
//! SSRF set covers loopback, link-local, RFC1918, and the cloud metadata
//! endpoints.

use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;
use url::{Host, Url};

use wow_core::{Decision, ToolArgs, ToolName, ToolRequest};
use wow_secrets::redact;
use wow_session::METRIC_WEB_SEARCHES;

use crate::context::GatewayContext;
use crate::handler::ToolHandler;

/// Host names that resolve to internal surfaces regardless of DNS.
const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata.google.internal", "metadata"];

const METADATA_V4: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);

fn ipv4_reason(addr: Ipv4Addr) -> Option<&'static str> {
    if addr == METADATA_V4 {
        Some("the cloud metadata endpoint")
    } else if addr.is_loopback() {
        Some("a loopback address")
    } else if addr.is_link_local() {
        Some("a link-local address")
    } else if addr.is_private() {
        Some("a private network address")
    } else {
        None
    }
}

fn ipv6_reason(addr: Ipv6Addr) -> Option<&'static str> {
    if addr.is_loopback() {
        Some("a loopback address")
    } else if let Some(v4) = addr.to_ipv4_mapped() {
        ipv4_reason(v4)
    } else if (addr.segments()[0] & 0xfe00) == 0xfc00 {
        Some("a unique-local address")
    } else if (addr.segments()[0] & 0xffc0) == 0xfe80 {
        Some("a link-local address")
    } else {
        None
    }
}

/// Why this URL is in the SSRF set, or `None` when it is outward-facing.
fn ssrf_reason(url: &Url) -> Option<&'static str> {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let lower = domain.to_ascii_lowercase();
            if BLOCKED_HOSTNAMES.contains(&lower.as_str()) {
                return Some("an internal host name");
            }
            // A domain that is actually a dotted quad parses as a domain in
            // some schemes; check it literally.
            if let Ok(IpAddr::V4(addr)) = lower.parse() {
                return ipv4_reason(addr);
            }
            None
        }
        Some(Host::Ipv4(addr)) => ipv4_reason(addr),
        Some(Host::Ipv6(addr)) => ipv6_reason(addr),
        None => None,
    }
}

/// PII shapes scanned out of search queries.
struct PiiPattern {
    label: &'static str,
    regex: Regex,
}

fn pii_patterns() -> &'static [PiiPattern] {
    static PATTERNS: OnceLock<Vec<PiiPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let specs: &[(&'static str, &str)] = &[
            ("an email address", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            ("a social security number", r"\b\d{3}-\d{2}-\d{4}\b"),
            ("a payment card number", r"\b(?:\d{4}[ -]){3}\d{4}\b|\b\d{15,16}\b"),
        ];
        specs
            .iter()
            .filter_map(|(label, pattern)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| PiiPattern { label, regex })
            })
            .collect()
    })
}

pub struct WebFetchHandler;

impl WebFetchHandler {
    pub fn new() -> WebFetchHandler {
        WebFetchHandler
    }
}

impl Default for WebFetchHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for WebFetchHandler {
    fn tool(&self) -> ToolName {
        ToolName::WebFetch
    }

    fn handle(&self, request: &ToolRequest, _cx: &mut GatewayContext) -> Decision {
        let ToolArgs::WebFetch { url } = &request.args else {
            return Decision::allow("not a WebFetch payload");
        };

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Decision::block_bypassable(format!(
                    "WEBFETCH URL does not parse ({e}); fix the URL or bypass"
                ));
            }
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return Decision::block_bypassable(format!(
                "WEBFETCH scheme '{}' is not fetchable; only http and https are",
                parsed.scheme()
            ));
        }

        if let Some(why) = ssrf_reason(&parsed) {
            return Decision::block_absolute(format!(
                "CRITICAL: WEBFETCH_SSRF {url} targets {why}; fetching is never allowed"
            ));
        }

        Decision::allow("url passed all checks")
    }
}

pub struct WebSearchHandler;

impl WebSearchHandler {
    pub fn new() -> WebSearchHandler {
        WebSearchHandler
    }
}

impl Default for WebSearchHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for WebSearchHandler {
    fn tool(&self) -> ToolName {
        ToolName::WebSearch
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::WebSearch { query } = &request.args else {
            return Decision::allow("not a WebSearch payload");
        };

        let searches = cx.session.increment_metric(METRIC_WEB_SEARCHES);
        let threshold = cx.config.limits.web_search_warn_threshold;
        if searches >= threshold {
            // Rate pressure is a warning signal, never a block.
            cx.emit(
                "search_rate_warning",
                format!("{searches} searches this session (threshold {threshold})"),
            );
        }

        let redaction = redact(query);
        if redaction.changed() {
            cx.record_credentials(&redaction);
            return Decision::block_bypassable(
                "CREDENTIAL secret embedded in search query was redacted; \
                 search without the secret or bypass",
            )
            .with_redacted_payload(redaction.redacted);
        }

        for pattern in pii_patterns() {
            if pattern.regex.is_match(query) {
                return Decision::block_bypassable(format!(
                    "PII search query contains {}; strip it or bypass",
                    pattern.label
                ));
            }
        }

        Decision::allow("query passed all checks")
    }
}
