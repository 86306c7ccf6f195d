// Resolution of single-backend services (uploads, SPARQL, shape/line/snapshot)

use crate::error::{MediatorError, Result};
use crate::host::SanitizedHost;
use crate::mediator::Mediator;
use crate::protocol::Protocol;
use crate::url_parts::ParsedUrl;
use tracing::debug;

impl Mediator {
    /// Pins a request for `service` to that service's own hosts.
    ///
    /// A relative reference (`geoshape:///?ids=Q1`) is sent to the first configured domain of the
    /// service; an explicit host keeps the protocol already chosen for it. Either way the final
    /// host must pass the service's exact-match allow-list, even when the generic `http`/`https`
    /// lists would have accepted it.
    pub(crate) fn resolve_service(
        &self,
        parsed: &ParsedUrl,
        sanitized: &SanitizedHost,
        service: Protocol,
    ) -> Result<SanitizedHost> {
        let first_domain = match self.allowlist.domains(service) {
            Some([first, ..]) => first,
            _ => return Err(MediatorError::ProtocolDisabled(service.to_string())),
        };

        let resolved = if parsed.is_relative_host {
            self.sanitize_host(first_domain)?
        } else {
            sanitized.clone()
        };

        if !self.allowlist.is_allowed(service, &resolved.host) {
            return Err(MediatorError::HostNotAllowed(format!(
                "{} (use {}/// or one of the hosts configured for {})",
                resolved.host, service, service
            )));
        }

        debug!("{} resolved to {}://{}", service, resolved.protocol, resolved.host);
        Ok(resolved)
    }
}
