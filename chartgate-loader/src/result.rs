use chartgate_core::{ChartData, Protocol};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    /// Chart-spec URL as requested.
    pub source: String,
    /// Concrete URL that was fetched.
    pub url: String,
    pub protocol: Protocol,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    pub data: ChartData,
}
