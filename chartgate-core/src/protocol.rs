use serde::{Deserialize, Serialize};
use std::fmt;

/// Every scheme a chart spec may use. Anything else is rejected before translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    WikiApi,
    WikiRest,
    WikiRaw,
    Tabular,
    Map,
    WikiFile,
    WikiRawUpload,
    WikidataSparql,
    GeoShape,
    GeoLine,
    MapSnapshot,
    WikiTitle,
}

impl Protocol {
    pub const COUNT: usize = 14;

    pub const ALL: [Protocol; Self::COUNT] = [
        Protocol::Http,
        Protocol::Https,
        Protocol::WikiApi,
        Protocol::WikiRest,
        Protocol::WikiRaw,
        Protocol::Tabular,
        Protocol::Map,
        Protocol::WikiFile,
        Protocol::WikiRawUpload,
        Protocol::WikidataSparql,
        Protocol::GeoShape,
        Protocol::GeoLine,
        Protocol::MapSnapshot,
        Protocol::WikiTitle,
    ];

    /// Scheme name without the trailing colon, as used in config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::WikiApi => "wikiapi",
            Protocol::WikiRest => "wikirest",
            Protocol::WikiRaw => "wikiraw",
            Protocol::Tabular => "tabular",
            Protocol::Map => "map",
            Protocol::WikiFile => "wikifile",
            Protocol::WikiRawUpload => "wikirawupload",
            Protocol::WikidataSparql => "wikidatasparql",
            Protocol::GeoShape => "geoshape",
            Protocol::GeoLine => "geoline",
            Protocol::MapSnapshot => "mapsnapshot",
            Protocol::WikiTitle => "wikititle",
        }
    }

    /// Parses a scheme name; the trailing colon is optional and case is ignored.
    pub fn parse(scheme: &str) -> Option<Self> {
        let scheme = scheme.strip_suffix(':').unwrap_or(scheme);
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(scheme))
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }

    /// Only the generic web protocols accept arbitrary subdomains of a configured domain.
    pub fn allows_subdomains(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }

    /// Protocols whose response comes from the wiki action API and must be checked for errors.
    pub fn is_api_call(&self) -> bool {
        matches!(
            self,
            Protocol::WikiApi | Protocol::WikiRaw | Protocol::Tabular | Protocol::Map
        )
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.as_str())
    }
}

/// Concrete transport of a translated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    Https,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Transport::Http => Protocol::Http,
            Transport::Https => Protocol::Https,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_colon() {
        assert_eq!(Protocol::parse("wikiraw"), Some(Protocol::WikiRaw));
        assert_eq!(Protocol::parse("wikiraw:"), Some(Protocol::WikiRaw));
        assert_eq!(Protocol::parse("HTTPS:"), Some(Protocol::Https));
        assert_eq!(Protocol::parse("nope"), None);
        assert_eq!(Protocol::parse(""), None);
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, protocol) in Protocol::ALL.iter().enumerate() {
            assert_eq!(protocol.index(), i);
            assert_eq!(Protocol::parse(protocol.as_str()), Some(*protocol));
        }
    }

    #[test]
    fn display_carries_colon() {
        assert_eq!(Protocol::WikidataSparql.to_string(), "wikidatasparql:");
        assert_eq!(Transport::Https.to_string(), "https");
    }

    #[test]
    fn api_protocols() {
        let api: Vec<_> = Protocol::ALL.iter().filter(|p| p.is_api_call()).collect();
        assert_eq!(
            api,
            [&Protocol::WikiApi, &Protocol::WikiRaw, &Protocol::Tabular, &Protocol::Map]
        );
        assert!(!Protocol::WikidataSparql.is_api_call());
    }
}
