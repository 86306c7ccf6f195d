use crate::allowlist::DomainAllowlist;
use crate::config::MediatorConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Receives non-fatal messages such as backend API warnings.
pub type WarningCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The trust boundary between chart specs and the network.
///
/// Translation and normalization are synchronous and take `&self`; a single mediator can be
/// shared across tasks behind an `Arc`.
pub struct Mediator {
    pub(crate) allowlist: DomainAllowlist,
    pub(crate) domain_map: HashMap<String, String>,
    pub(crate) is_trusted: bool,
    pub(crate) language_code: Option<String>,
    logger: Option<WarningCallback>,
}

impl Mediator {
    pub fn new(config: MediatorConfig) -> Self {
        let MediatorConfig {
            domains,
            domain_map,
            is_trusted,
            language_code,
        } = config;

        let domain_map = domain_map
            .into_iter()
            .map(|(alias, domain)| {
                (
                    alias.trim().to_ascii_lowercase(),
                    domain.trim().to_ascii_lowercase(),
                )
            })
            .collect();

        Self {
            allowlist: DomainAllowlist::new(&domains),
            domain_map,
            is_trusted,
            language_code: language_code.filter(|code| !code.trim().is_empty()),
            logger: None,
        }
    }

    /// Route warnings to `logger` instead of `tracing::warn!`.
    pub fn with_logger(mut self, logger: WarningCallback) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn is_trusted(&self) -> bool {
        self.is_trusted
    }

    pub fn allowlist(&self) -> &DomainAllowlist {
        &self.allowlist
    }

    pub(crate) fn warn(&self, message: &str) {
        match self.logger {
            Some(ref logger) => logger(message),
            None => warn!("{}", message),
        }
    }
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new(MediatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn logger_receives_warnings() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let mediator = Mediator::default().with_logger(Arc::new(move |msg: &str| {
            seen_clone.lock().unwrap().push(msg.to_string());
        }));

        mediator.warn("careful");
        assert_eq!(*seen.lock().unwrap(), vec!["careful".to_string()]);
    }

    #[test]
    fn blank_language_code_is_dropped() {
        let mediator = Mediator::new(MediatorConfig::default().with_language_code("  "));
        assert!(mediator.language_code.is_none());
    }

    #[test]
    fn mediator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mediator>();
    }
}
