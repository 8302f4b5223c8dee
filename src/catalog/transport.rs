use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::CatalogConfig;
use crate::errors::{AppError, AppResult, TransportError, TransportResult};

/// Fetches raw documents from the remote catalog.
///
/// Implementations perform a single attempt per call; retrying is left to
/// the caller.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// GET `url` and return the response body as text
    async fn fetch_text(&self, url: &Url) -> TransportResult<String>;
}

/// reqwest-backed transport with optional bearer token and request spacing
pub struct HttpCatalogTransport {
    client: Client,
    api_token: Option<String>,
    throttle: Option<Throttle>,
}

impl HttpCatalogTransport {
    /// Build a transport from catalog settings
    pub fn from_config(config: &CatalogConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_token: config.api_token.clone().filter(|t| !t.trim().is_empty()),
            throttle: Throttle::new(config.min_request_interval),
        })
    }

    fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    async fn fetch_text(&self, url: &Url) -> TransportResult<String> {
        if let Some(throttle) = &self.throttle {
            throttle.wait_turn().await;
        }

        debug!("Fetching catalog document: {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = Self::retry_after_seconds(&response);
            warn!("Catalog rate limit hit for {} (retry after {:?}s)", url, retry_after);
            return Err(TransportError::RateLimited {
                url: url.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Keeps outbound requests at least `interval` apart
struct Throttle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    fn new(interval: Duration) -> Option<Self> {
        (!interval.is_zero()).then(|| Self {
            interval,
            next_slot: Mutex::new(None),
        })
    }

    async fn wait_turn(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *next_slot {
            Some(slot) if slot > now => {
                debug!("Throttling catalog request for {:?}", slot - now);
                tokio::time::sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *next_slot = Some(start + self.interval);
    }
}
