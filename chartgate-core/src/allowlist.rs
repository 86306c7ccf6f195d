// Per-protocol host allow-lists

use crate::protocol::Protocol;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Compiled host test for one protocol.
#[derive(Debug)]
pub enum HostPredicate {
    /// No domains configured; every host is rejected.
    Never,
    Pattern(Regex),
}

impl HostPredicate {
    /// Builds `^([^@/:]*\.)?(d1|d2|...)$` (case-insensitive). The optional subdomain group is only
    /// emitted when `allow_subdomains` is set. Every domain is fully escaped so that a `.` only
    /// ever matches a literal dot.
    pub fn compile(domains: &[String], allow_subdomains: bool) -> Self {
        let alternatives: Vec<String> = domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return HostPredicate::Never;
        }

        let pattern = format!(
            "^{}({})$",
            if allow_subdomains { r"([^@/:]*\.)?" } else { "" },
            alternatives.join("|")
        );

        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => HostPredicate::Pattern(re),
            Err(e) => {
                // size limit
                warn!("Failed to compile host pattern {}: {}", pattern, e);
                HostPredicate::Never
            }
        }
    }

    pub fn test(&self, host: &str) -> bool {
        match self {
            HostPredicate::Never => false,
            HostPredicate::Pattern(re) => re.is_match(host),
        }
    }
}

/// Allowed domain suffixes per protocol, with lazily compiled predicates.
///
/// Each protocol owns a write-once slot. The first caller compiles the predicate; compilation is
/// pure, so a racing caller would produce an identical value, and reads after that never lock.
#[derive(Debug)]
pub struct DomainAllowlist {
    domains: HashMap<Protocol, Vec<String>>,
    compiled: [OnceLock<HostPredicate>; Protocol::COUNT],
}

impl DomainAllowlist {
    /// Keys may carry a trailing colon (`"wikiraw:"`). Keys naming no supported protocol are
    /// ignored.
    pub fn new(config: &HashMap<String, Vec<String>>) -> Self {
        let mut keys: Vec<&String> = config.keys().collect();
        keys.sort();

        let mut domains: HashMap<Protocol, Vec<String>> = HashMap::new();
        for key in keys {
            let list = &config[key];
            match Protocol::parse(key) {
                Some(protocol) => {
                    domains
                        .entry(protocol)
                        .or_default()
                        .extend(list.iter().map(|d| d.trim().to_ascii_lowercase()));
                }
                None => warn!("Ignoring allow-list for unsupported protocol '{}'", key),
            }
        }

        Self {
            domains,
            compiled: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// The configured domains for `protocol`, in configuration order. `None` when the protocol
    /// has no entry at all.
    pub fn domains(&self, protocol: Protocol) -> Option<&[String]> {
        self.domains.get(&protocol).map(Vec::as_slice)
    }

    pub fn predicate(&self, protocol: Protocol) -> &HostPredicate {
        self.compiled[protocol.index()].get_or_init(|| {
            debug!("Compiling host allow-list for {}", protocol);
            match self.domains(protocol) {
                Some(list) => HostPredicate::compile(list, protocol.allows_subdomains()),
                None => HostPredicate::Never,
            }
        })
    }

    pub fn is_allowed(&self, protocol: Protocol, host: &str) -> bool {
        self.predicate(protocol).test(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist(entries: &[(&str, Vec<&str>)]) -> DomainAllowlist {
        let config = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        DomainAllowlist::new(&config)
    }

    #[test]
    fn https_accepts_subdomains() {
        let list = allowlist(&[("https", vec!["sec.org"])]);
        assert!(list.is_allowed(Protocol::Https, "sec.org"));
        assert!(list.is_allowed(Protocol::Https, "any.sec.org"));
        assert!(list.is_allowed(Protocol::Https, "a.b.SEC.org"));
        assert!(!list.is_allowed(Protocol::Https, "asec.org"));
        assert!(!list.is_allowed(Protocol::Https, "sec.org.evil.com"));
        assert!(!list.is_allowed(Protocol::Https, "user@sec.org"));
    }

    #[test]
    fn every_dot_is_literal() {
        let list = allowlist(&[("https", vec!["wiki.media.org"])]);
        assert!(list.is_allowed(Protocol::Https, "wiki.media.org"));
        assert!(!list.is_allowed(Protocol::Https, "wiki.mediaXorg"));
        assert!(!list.is_allowed(Protocol::Https, "wikiXmedia.org"));
    }

    #[test]
    fn service_protocols_require_exact_host() {
        let list = allowlist(&[("wikirawupload:", vec!["upload.example.org"])]);
        assert!(list.is_allowed(Protocol::WikiRawUpload, "upload.example.org"));
        assert!(!list.is_allowed(Protocol::WikiRawUpload, "a.upload.example.org"));
    }

    #[test]
    fn unconfigured_protocol_rejects_everything() {
        let list = allowlist(&[("http", vec!["nonsec.org"])]);
        assert!(list.domains(Protocol::WikidataSparql).is_none());
        assert!(!list.is_allowed(Protocol::WikidataSparql, "nonsec.org"));
        assert!(!list.is_allowed(Protocol::Https, "nonsec.org"));
    }

    #[test]
    fn empty_list_rejects_everything() {
        let list = allowlist(&[("https", vec![])]);
        assert!(matches!(list.predicate(Protocol::Https), HostPredicate::Never));
        assert!(!list.is_allowed(Protocol::Https, ""));
    }

    #[test]
    fn predicate_is_compiled_once() {
        let list = allowlist(&[("https", vec!["sec.org"])]);
        let first = list.predicate(Protocol::Https) as *const HostPredicate;
        let second = list.predicate(Protocol::Https) as *const HostPredicate;
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let list = allowlist(&[("nope", vec!["sec.org"]), ("geoshape", vec!["maps.sec.org"])]);
        assert_eq!(
            list.domains(Protocol::GeoShape),
            Some(&["maps.sec.org".to_string()][..])
        );
    }
}
