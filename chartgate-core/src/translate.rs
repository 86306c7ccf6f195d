// Pseudo-protocol translation
//
// Rewrites a chart-spec URL into a concrete http(s) request against an allow-listed host,
// or rejects it before anything touches the network.

use crate::error::{MediatorError, Result};
use crate::host::SanitizedHost;
use crate::mediator::Mediator;
use crate::protocol::{Protocol, Transport};
use crate::url_parts::{ParsedUrl, QueryMap, RequestDescriptor, parse_url, repair_nested_scheme};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

pub const API_PATH: &str = "/w/api.php";
pub const SPARQL_PATH: &str = "/bigdata/namespace/wdq/sparql";
pub const FILE_REDIRECT_PATH: &str = "/wiki/Special:Redirect/file";
pub const SPARQL_ACCEPT: &str = "application/sparql-results+json";
const WIKI_PREFIX: &str = "/wiki/";
const DEFAULT_SNAPSHOT_STYLE: &str = "osm-intl";

/// What `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").unwrap());
static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+\.?[0-9]*$").unwrap());
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-_0-9a-z]+$").unwrap());
static LANG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-_0-9a-zA-Z]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Data load requested by the chart.
    #[default]
    Fetch,
    /// Link the chart wants to open; only wiki pages are reachable.
    Navigate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub kind: RequestKind,
    /// Host used when the URL has none, normally the wiki rendering the chart.
    pub default_domain: String,
    /// Overrides the configured language for `tabular:` and `map:` requests.
    pub site_language: Option<String>,
}

impl RequestContext {
    pub fn fetch(default_domain: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Fetch,
            default_domain: default_domain.into(),
            site_language: None,
        }
    }

    pub fn navigate(default_domain: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Navigate,
            ..Self::fetch(default_domain)
        }
    }

    pub fn with_site_language(mut self, language: impl Into<String>) -> Self {
        self.site_language = Some(language.into());
        self
    }
}

/// Result of a successful translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub request: RequestDescriptor,
    /// Protocol the chart asked for; selects the response normalization.
    pub protocol: Protocol,
    /// The target is a cross-origin wiki API call.
    pub add_cors_origin: bool,
    /// Extra request headers the transport must send.
    pub headers: Vec<(String, String)>,
}

impl Translation {
    fn new(request: RequestDescriptor, protocol: Protocol) -> Self {
        Self {
            request,
            protocol,
            add_cors_origin: false,
            headers: Vec::new(),
        }
    }

    fn with_cors(mut self) -> Self {
        self.add_cors_origin = true;
        self
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn url(&self) -> String {
        self.request.to_url()
    }
}

impl Mediator {
    /// Translates a chart-spec URL into a concrete request.
    pub fn translate(&self, raw_url: &str, context: &RequestContext) -> Result<Translation> {
        let repaired = repair_nested_scheme(raw_url);
        let parsed = parse_url(&repaired, &context.default_domain);
        let sanitized = self.sanitize_host(&parsed.host)?;

        let (protocol, is_relative_protocol) = match parsed.scheme.as_deref() {
            Some(scheme) => match Protocol::parse(scheme) {
                Some(protocol) => (protocol, false),
                None => return Err(MediatorError::UnknownProtocol(raw_url.to_string())),
            },
            None => (sanitized.protocol.protocol(), true),
        };

        let translation = match context.kind {
            RequestKind::Navigate => self.translate_navigation(
                raw_url,
                parsed,
                sanitized,
                protocol,
                is_relative_protocol,
            )?,
            RequestKind::Fetch => {
                self.translate_fetch(raw_url, parsed, sanitized, protocol, context)?
            }
        };

        debug!("Translated {} to {}", raw_url, translation.url());
        Ok(translation)
    }

    fn translate_navigation(
        &self,
        raw_url: &str,
        parsed: ParsedUrl,
        sanitized: SanitizedHost,
        protocol: Protocol,
        is_relative_protocol: bool,
    ) -> Result<Translation> {
        let encoded_title = match protocol {
            Protocol::Http | Protocol::Https if !is_relative_protocol => parsed
                .pathname
                .strip_prefix(WIKI_PREFIX)
                .filter(|title| !title.is_empty())
                .ok_or_else(|| {
                    MediatorError::MalformedTitle(format!(
                        "http(s) links must begin with {}: {}",
                        WIKI_PREFIX, raw_url
                    ))
                })?,
            Protocol::Http | Protocol::Https | Protocol::WikiTitle => parsed
                .pathname
                .strip_prefix('/')
                .unwrap_or(&parsed.pathname),
            _ => {
                return Err(MediatorError::UnknownProtocol(format!(
                    "{} (links may only open wiki pages, e.g. wikititle:///My_page)",
                    raw_url
                )));
            }
        };

        if !parsed.query.is_empty() {
            return Err(MediatorError::invalid(
                Protocol::WikiTitle.to_string(),
                "query",
                "query parameters are not allowed",
            ));
        }

        let title = checked_title(encoded_title, Protocol::WikiTitle)?;
        let title = title.replace(' ', "_");

        let request = RequestDescriptor {
            protocol: sanitized.protocol,
            host: sanitized.host,
            pathname: format!("{}{}", WIKI_PREFIX, utf8_percent_encode(&title, COMPONENT)),
            query: QueryMap::new(),
        };
        Ok(Translation::new(request, Protocol::WikiTitle))
    }

    fn translate_fetch(
        &self,
        raw_url: &str,
        parsed: ParsedUrl,
        sanitized: SanitizedHost,
        protocol: Protocol,
        context: &RequestContext,
    ) -> Result<Translation> {
        let translation = match protocol {
            Protocol::Http | Protocol::Https => {
                if !self.is_trusted {
                    return Err(MediatorError::UntrustedRawProtocol(raw_url.to_string()));
                }
                // the original scheme is kept; only the host went through the alias table
                let transport = match protocol {
                    Protocol::Http => Transport::Http,
                    _ => Transport::Https,
                };
                Translation::new(
                    RequestDescriptor {
                        protocol: transport,
                        host: sanitized.host,
                        pathname: parsed.pathname,
                        query: parsed.query,
                    },
                    protocol,
                )
            }

            Protocol::WikiApi => {
                let mut query = parsed.query;
                query.insert("format", "json");
                query.insert("formatversion", "2");
                Translation::new(api_request(sanitized, query), protocol).with_cors()
            }

            Protocol::WikiRest => {
                reject_dot_segments(&parsed.pathname, protocol)?;
                if !parsed.pathname.starts_with("/api/") {
                    return Err(MediatorError::invalid(
                        protocol.to_string(),
                        "path",
                        "must begin with /api/",
                    ));
                }
                Translation::new(
                    RequestDescriptor {
                        protocol: sanitized.protocol,
                        host: sanitized.host,
                        pathname: parsed.pathname,
                        query: parsed.query,
                    },
                    protocol,
                )
            }

            Protocol::WikiRaw | Protocol::Tabular | Protocol::Map => {
                let decoded = decode_path(&parsed.pathname, protocol)?;
                let title = decoded
                    .strip_prefix('/')
                    .filter(|title| !title.is_empty() && !title.contains('|'))
                    .ok_or_else(|| {
                        MediatorError::MalformedTitle(format!("{} {}", protocol, raw_url))
                    })?;

                let mut query: QueryMap = [("format", "json"), ("formatversion", "2")]
                    .into_iter()
                    .collect();
                if protocol == Protocol::WikiRaw {
                    query.insert("action", "query");
                    query.insert("prop", "revisions");
                    query.insert("rvprop", "content");
                    query.insert("titles", title);
                } else {
                    query.insert("action", "jsondata");
                    query.insert("title", title);
                    let language = context
                        .site_language
                        .as_deref()
                        .filter(|lang| !lang.is_empty())
                        .or(self.language_code.as_deref());
                    if let Some(language) = language {
                        query.insert("uselang", language);
                    }
                }
                Translation::new(api_request(sanitized, query), protocol).with_cors()
            }

            Protocol::WikiFile => {
                reject_dot_segments(&parsed.pathname, protocol)?;
                Translation::new(
                    RequestDescriptor {
                        protocol: sanitized.protocol,
                        host: sanitized.host,
                        pathname: format!("{}{}", FILE_REDIRECT_PATH, parsed.pathname),
                        query: parsed.query,
                    },
                    protocol,
                )
            }

            Protocol::WikiRawUpload => {
                reject_dot_segments(&parsed.pathname, protocol)?;
                let target = self.resolve_service(&parsed, &sanitized, protocol)?;
                Translation::new(
                    RequestDescriptor {
                        protocol: target.protocol,
                        host: target.host,
                        pathname: parsed.pathname,
                        query: QueryMap::new(),
                    },
                    protocol,
                )
            }

            Protocol::WikidataSparql => {
                let target = self.resolve_service(&parsed, &sanitized, protocol)?;
                let sparql = parsed
                    .query
                    .get("query")
                    .filter(|q| !q.is_empty())
                    .ok_or_else(|| MediatorError::missing(protocol.to_string(), "query"))?;
                Translation::new(
                    RequestDescriptor {
                        protocol: target.protocol,
                        host: target.host,
                        pathname: SPARQL_PATH.to_string(),
                        query: [("query", sparql)].into_iter().collect(),
                    },
                    protocol,
                )
                .with_header("Accept", SPARQL_ACCEPT)
            }

            Protocol::GeoShape | Protocol::GeoLine => {
                let target = self.resolve_service(&parsed, &sanitized, Protocol::GeoShape)?;
                let has_selector = ["ids", "query"]
                    .iter()
                    .any(|name| parsed.query.get(name).is_some_and(|v| !v.is_empty()));
                if !has_selector {
                    return Err(MediatorError::missing(protocol.to_string(), "ids or query"));
                }
                let pathname = match protocol {
                    Protocol::GeoShape => "/shape",
                    _ => "/line",
                };
                Translation::new(
                    RequestDescriptor {
                        protocol: target.protocol,
                        host: target.host,
                        pathname: pathname.to_string(),
                        query: parsed.query,
                    },
                    protocol,
                )
            }

            Protocol::MapSnapshot => {
                let (pathname, query) = snapshot_request(&parsed.query)?;
                let target = self.resolve_service(&parsed, &sanitized, Protocol::GeoShape)?;
                Translation::new(
                    RequestDescriptor {
                        protocol: target.protocol,
                        host: target.host,
                        pathname,
                        query,
                    },
                    protocol,
                )
            }

            Protocol::WikiTitle => {
                return Err(MediatorError::UnknownProtocol(format!(
                    "{} (wikititle: is only valid for links)",
                    raw_url
                )));
            }
        };

        Ok(translation)
    }
}

fn api_request(sanitized: SanitizedHost, query: QueryMap) -> RequestDescriptor {
    RequestDescriptor {
        protocol: sanitized.protocol,
        host: sanitized.host,
        pathname: API_PATH.to_string(),
        query,
    }
}

fn decode_path(pathname: &str, protocol: Protocol) -> Result<String> {
    percent_decode_str(pathname)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| MediatorError::MalformedTitle(format!("{} path is not valid UTF-8", protocol)))
}

/// Rejects `.` and `..` path segments, including percent-encoded and backslash-separated forms,
/// which a WHATWG parser would resolve away before the request is sent.
fn reject_dot_segments(pathname: &str, protocol: Protocol) -> Result<()> {
    let decoded = percent_decode_str(pathname).decode_utf8_lossy();
    if decoded.split(['/', '\\']).any(|segment| segment == "." || segment == "..") {
        return Err(MediatorError::invalid(
            protocol.to_string(),
            "path",
            "may not contain . or .. segments",
        ));
    }
    Ok(())
}

/// Decodes and trims a page title, rejecting empty titles and titles containing `|`.
fn checked_title(encoded: &str, protocol: Protocol) -> Result<String> {
    let decoded = decode_path(encoded, protocol)?;
    let title = decoded.trim();
    if title.is_empty() {
        return Err(MediatorError::MalformedTitle(format!("{} empty title", protocol)));
    }
    if title.contains('|') {
        return Err(MediatorError::MalformedTitle(format!(
            "{} title may not contain '|': {}",
            protocol, title
        )));
    }
    Ok(title.to_string())
}

/// Validates a numeric query parameter against `[min, max]` and returns it as written.
fn numeric_param<'a>(
    query: &'a QueryMap,
    name: &str,
    min: f64,
    max: f64,
    decimal: bool,
) -> Result<&'a str> {
    let protocol = Protocol::MapSnapshot.to_string();
    let value = query
        .get(name)
        .ok_or_else(|| MediatorError::missing(&protocol, name))?;

    let pattern = if decimal { &DECIMAL_RE } else { &INTEGER_RE };
    if !pattern.is_match(value) {
        return Err(MediatorError::invalid(&protocol, name, "is not a number"));
    }

    let number: f64 = value
        .parse()
        .map_err(|_| MediatorError::invalid(&protocol, name, "is not a number"))?;
    if number < min || number > max {
        return Err(MediatorError::invalid(
            &protocol,
            name,
            format!("must be between {} and {}", min, max),
        ));
    }

    Ok(value)
}

/// Builds `/img/{style},{zoom},{lat},{lon},{width}x{height}@2x.png` for the map snapshot service.
fn snapshot_request(query: &QueryMap) -> Result<(String, QueryMap)> {
    let protocol = Protocol::MapSnapshot.to_string();

    let width = numeric_param(query, "width", 1.0, 4096.0, false)?;
    let height = numeric_param(query, "height", 1.0, 4096.0, false)?;
    let zoom = numeric_param(query, "zoom", 0.0, 22.0, false)?;
    let lat = numeric_param(query, "lat", -90.0, 90.0, true)?;
    let lon = numeric_param(query, "lon", -180.0, 180.0, true)?;

    let style = match query.get("style") {
        Some(style) if STYLE_RE.is_match(style) => style,
        Some(_) => {
            return Err(MediatorError::invalid(
                &protocol,
                "style",
                "may only contain lowercase letters, digits, dashes and underscores",
            ));
        }
        None => DEFAULT_SNAPSHOT_STYLE,
    };

    let mut snapshot_query = QueryMap::new();
    if let Some(lang) = query.get("lang") {
        if !LANG_RE.is_match(lang) {
            return Err(MediatorError::invalid(
                &protocol,
                "lang",
                "may only contain letters, digits, dashes and underscores",
            ));
        }
        snapshot_query.insert("lang", lang);
    }

    let pathname = format!(
        "/img/{},{},{},{},{}x{}@2x.png",
        style, zoom, lat, lon, width, height
    );
    Ok((pathname, snapshot_query))
}
