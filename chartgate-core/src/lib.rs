pub mod allowlist;
pub mod config;
pub mod error;
pub mod host;
pub mod mediator;
pub mod normalize;
pub mod protocol;
pub mod service;
pub mod sparql;
pub mod translate;
pub mod url_parts;

pub use allowlist::{DomainAllowlist, HostPredicate};
pub use config::{ConfigError, MediatorConfig};
pub use error::{MediatorError, Result};
pub use host::SanitizedHost;
pub use mediator::{Mediator, WarningCallback};
pub use normalize::ChartData;
pub use protocol::{Protocol, Transport};
pub use translate::{RequestContext, RequestKind, Translation};
pub use url_parts::{ParsedUrl, QueryMap, RequestDescriptor, format_url, parse_url};
