use chartgate_core::MediatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Request rejected: {0}")]
    Rejected(#[from] MediatorError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {source}")]
    InvalidResponse { url: String, source: MediatorError },
}

impl LoadError {
    /// Failures of the network round trip itself, as opposed to a refused request or a bad payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
