use crate::error::{MediatorError, Result};
use crate::mediator::Mediator;
use crate::protocol::{Protocol, Transport};
use serde::Serialize;
use url::Host;

/// A canonical host together with the transport it may be reached over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedHost {
    pub host: String,
    pub protocol: Transport,
}

impl Mediator {
    /// Remaps `host` through the alias table, then picks `https` or `http` (in that order)
    /// depending on which allow-list accepts it.
    ///
    /// The host is reduced to the form a WHATWG parser would connect to before any allow-list is
    /// consulted; anything that is not a plain host with an optional numeric port is rejected.
    pub fn sanitize_host(&self, host: &str) -> Result<SanitizedHost> {
        let host = host.trim().to_ascii_lowercase();
        let host = self.domain_map.get(&host).cloned().unwrap_or(host);
        let host = canonical_host(&host).ok_or(MediatorError::HostNotAllowed(host))?;

        let protocol = if self.allowlist.is_allowed(Protocol::Https, &host) {
            Transport::Https
        } else if self.allowlist.is_allowed(Protocol::Http, &host) {
            Transport::Http
        } else {
            return Err(MediatorError::HostNotAllowed(host));
        };

        Ok(SanitizedHost { host, protocol })
    }
}

/// Parses `host[:port]` the way the transport will, returning its serialized form.
fn canonical_host(authority: &str) -> Option<String> {
    let (name, port) = match authority.rfind(':') {
        Some(i) if !authority[i..].contains(']') => (&authority[..i], Some(&authority[i + 1..])),
        _ => (authority, None),
    };

    let host = Host::parse(name).ok()?.to_string();

    match port {
        Some(port) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            port.parse::<u16>().ok().map(|port| format!("{}:{}", host, port))
        }
        Some(_) => None,
        None => Some(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediatorConfig;

    fn mediator() -> Mediator {
        Mediator::new(
            MediatorConfig::default()
                .with_domains("http", ["nonsec.org"])
                .with_domains("https", ["sec.org"])
                .with_alias("sec", "sec.org")
                .with_alias("nonsec", "nonsec.org"),
        )
    }

    #[test]
    fn prefers_https() {
        let mediator = Mediator::new(
            MediatorConfig::default()
                .with_domains("http", ["both.org"])
                .with_domains("https", ["both.org"]),
        );
        let sanitized = mediator.sanitize_host("both.org").unwrap();
        assert_eq!(sanitized.protocol, Transport::Https);
    }

    #[test]
    fn applies_alias_before_allow_list() {
        let sanitized = mediator().sanitize_host("sec").unwrap();
        assert_eq!(sanitized.host, "sec.org");
        assert_eq!(sanitized.protocol, Transport::Https);

        let sanitized = mediator().sanitize_host("nonsec").unwrap();
        assert_eq!(sanitized.host, "nonsec.org");
        assert_eq!(sanitized.protocol, Transport::Http);
    }

    #[test]
    fn subdomains_keep_their_name() {
        let sanitized = mediator().sanitize_host("Any.Sec.org").unwrap();
        assert_eq!(sanitized.host, "any.sec.org");
    }

    #[test]
    fn rejects_unlisted_host() {
        assert_eq!(
            mediator().sanitize_host("asec.org"),
            Err(MediatorError::HostNotAllowed("asec.org".to_string()))
        );
    }

    #[test]
    fn rejects_hosts_a_browser_would_read_differently() {
        for host in [
            r"evil.com\.sec.org",
            "evil.com%5c.sec.org",
            "evil.com .sec.org",
            "evil.com@sec.org",
            "user:pw@sec.org",
            "sec.org:",
            "sec.org:http",
            "sec.org:99999",
        ] {
            assert!(
                matches!(mediator().sanitize_host(host), Err(MediatorError::HostNotAllowed(_))),
                "{} should be rejected",
                host
            );
        }
    }

    #[test]
    fn canonicalizes_before_matching() {
        let sanitized = mediator().sanitize_host("evil%2ecom.sec.org").unwrap();
        assert_eq!(sanitized.host, "evil.com.sec.org");

        let local =
            Mediator::new(MediatorConfig::default().with_domains("http", ["127.0.0.1:8080"]));
        let sanitized = local.sanitize_host("127.0.0.1:8080").unwrap();
        assert_eq!(sanitized.host, "127.0.0.1:8080");
        assert_eq!(sanitized.protocol, Transport::Http);
    }
}
