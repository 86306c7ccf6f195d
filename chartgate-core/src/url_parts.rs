// URL decomposition and formatting for pseudo-protocol requests.
//
// Pseudo-protocol URLs such as `wikiraw:///Page` or `http:///wiki/Page` do not follow the
// special-scheme rules of WHATWG parsing (which would turn `http:///wiki/x` into host `wiki`),
// so decomposition is done on the raw string instead of through `url::Url`.

use crate::protocol::Transport;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use url::form_urlencoded;

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").unwrap());

static NESTED_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+):https?://").unwrap());

/// Characters that may not appear raw in a formatted path. `%` is left alone so that
/// already-encoded input is not encoded twice.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Insertion-ordered query parameters. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryMap(Vec<(String, String)>);

impl QueryMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decodes an `application/x-www-form-urlencoded` query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut map = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            map.insert(key, value);
        }
        map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// A raw chart-spec URL broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Lowercased scheme without the colon, `None` for protocol-relative input.
    pub scheme: Option<String>,
    pub host: String,
    /// Path exactly as written, still percent-encoded.
    pub pathname: String,
    pub query: QueryMap,
    /// No host was given and `host` holds the caller's default domain.
    pub is_relative_host: bool,
}

/// Collapses `scheme:http://...` and `scheme:https://...` into `scheme://...`.
pub fn repair_nested_scheme(raw: &str) -> Cow<'_, str> {
    NESTED_SCHEME_RE.replace(raw, "$1://")
}

/// Splits `raw` into scheme, authority, path and query. The fragment is dropped.
/// When no host is present, `default_domain` is substituted and the result is marked relative.
pub fn parse_url(raw: &str, default_domain: &str) -> ParsedUrl {
    let (scheme, rest) = match SCHEME_RE.captures(raw) {
        Some(caps) => {
            let end = caps.get(0).map_or(0, |m| m.end());
            (Some(caps[1].to_ascii_lowercase()), &raw[end..])
        }
        None => (None, raw),
    };

    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);

    let (authority, rest) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?']).unwrap_or(after.len());
            (&after[..end], &after[end..])
        }
        None => ("", rest),
    };

    let (pathname, query) = rest.split_once('?').unwrap_or((rest, ""));

    let (host, is_relative_host) = if authority.is_empty() {
        (default_domain.trim().to_ascii_lowercase(), true)
    } else {
        (authority.to_ascii_lowercase(), false)
    };

    ParsedUrl {
        scheme,
        host,
        pathname: pathname.to_string(),
        query: QueryMap::parse(query),
        is_relative_host,
    }
}

/// A fully translated request, ready to be sent by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub protocol: Transport,
    pub host: String,
    pub pathname: String,
    pub query: QueryMap,
}

impl RequestDescriptor {
    pub fn to_url(&self) -> String {
        format_url(self)
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_url(self))
    }
}

pub fn format_url(request: &RequestDescriptor) -> String {
    let mut url = format!("{}://{}", request.protocol, request.host);

    if !request.pathname.starts_with('/') {
        url.push('/');
    }
    url.extend(utf8_percent_encode(&request.pathname, PATH));

    if !request.query.is_empty() {
        url.push('?');
        url.push_str(&request.query.to_query_string());
    }

    url
}
