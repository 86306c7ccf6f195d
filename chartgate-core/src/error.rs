use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediatorError {
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("URL hostname is not allowed: {0}")]
    HostNotAllowed(String),

    #[error("{0} protocol is disabled")]
    ProtocolDisabled(String),

    #[error("Invalid title: {0}")]
    MalformedTitle(String),

    #[error("{protocol} missing required parameter '{name}'")]
    MissingRequiredParameter { protocol: String, name: String },

    #[error("{protocol} parameter '{name}' is not valid: {reason}")]
    InvalidParameter {
        protocol: String,
        name: String,
        reason: String,
    },

    #[error("HTTP and HTTPS protocols are not supported for untrusted graphs: {0}")]
    UntrustedRawProtocol(String),

    #[error("API error: {0}")]
    UpstreamApiError(String),

    #[error("Unexpected response shape: {0}")]
    UpstreamDataShapeError(String),

    #[error("Page content not available: {0}")]
    ContentExtractionFailure(String),
}

impl MediatorError {
    pub(crate) fn missing(protocol: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingRequiredParameter {
            protocol: protocol.into(),
            name: name.into(),
        }
    }

    pub(crate) fn invalid(
        protocol: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            protocol: protocol.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while inspecting a backend response rather than
    /// while translating the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamApiError(_)
                | Self::UpstreamDataShapeError(_)
                | Self::ContentExtractionFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MediatorError>;
