use crate::error::{LoadError, Result};
use crate::result::LoadResult;
use chartgate_core::{Mediator, RequestContext};
use futures::future::join_all;
use reqwest::Client;
use reqwest::redirect::{Attempt, Policy};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const MAX_REDIRECTS: usize = 5;

/// Called with the number of finished loads and the chart URL that just finished.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Fetches chart data through a [`Mediator`]: every URL is translated first, and only the
/// translated request ever reaches the network.
pub struct Loader {
    client: Client,
    mediator: Arc<Mediator>,
    cors_origin: Option<String>,
    progress_callback: Option<ProgressCallback>,
}

impl Loader {
    pub fn new(mediator: Arc<Mediator>) -> Result<Self> {
        Self::with_timeout(mediator, 10)
    }

    pub fn with_timeout(mediator: Arc<Mediator>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Chartgate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(redirect_policy(mediator.clone()))
            .build()?;

        Ok(Self {
            client,
            mediator,
            cors_origin: None,
            progress_callback: None,
        })
    }

    /// Origin sent as `origin=` on cross-origin wiki API calls.
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn mediator(&self) -> &Mediator {
        &self.mediator
    }

    /// Translates, fetches and normalizes a single chart data URL.
    pub async fn load(&self, raw_url: &str, context: &RequestContext) -> Result<LoadResult> {
        let mut translation = self.mediator.translate(raw_url, context)?;

        if translation.add_cors_origin
            && let Some(ref origin) = self.cors_origin
        {
            translation.request.query.insert("origin", origin.as_str());
        }

        let url = translation.url();
        let target =
            Url::parse(&url).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching {} for {}", url, raw_url);
        let mut request = self.client.get(target);
        for (name, value) in &translation.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let start = Instant::now();
        let response = request.send().await?;
        let response_time = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await?;
        let data = self
            .mediator
            .normalize(&body, translation.protocol)
            .map_err(|source| LoadError::InvalidResponse {
                url: url.clone(),
                source,
            })?;

        Ok(LoadResult {
            source: raw_url.to_string(),
            url,
            protocol: translation.protocol,
            status_code: status.as_u16(),
            content_type,
            response_time,
            data,
        })
    }

    /// Loads every URL concurrently. Results come back in input order, one per URL.
    pub async fn load_all(
        &self,
        raw_urls: &[String],
        context: &RequestContext,
    ) -> Vec<Result<LoadResult>> {
        info!("Loading {} chart data URLs", raw_urls.len());
        let finished = AtomicUsize::new(0);

        let loads = raw_urls.iter().map(|raw_url| {
            let finished = &finished;
            async move {
                let result = self.load(raw_url, context).await;
                if let Err(ref e) = result {
                    warn!("Load failed for {}: {}", raw_url, e);
                }
                let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(ref callback) = self.progress_callback {
                    callback(done, raw_url.clone());
                }
                result
            }
        });

        join_all(loads).await
    }
}

/// Follows redirects only to hosts the mediator would have accepted in the first place.
fn redirect_policy(mediator: Arc<Mediator>) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let url = attempt.url();
        let host = url.host_str().map(|host| match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        });

        match host {
            Some(host) if mediator.sanitize_host(&host).is_ok() => attempt.follow(),
            _ => {
                warn!("Not following redirect to {}", attempt.url());
                attempt.stop()
            }
        }
    })
}
