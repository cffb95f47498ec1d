use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::trace;
use url::Url;

use crate::config::FetchConfig;
use crate::error::Result;

/// Status and raw body of one GET request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The only thing the fetcher needs from the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET. `Err` means no HTTP response was obtained at all.
    async fn get(&self, url: &Url) -> Result<FetchResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client. In-flight requests are
/// capped at `max_concurrent`.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
    permits: Arc<Semaphore>,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = self.permits.acquire().await;

        trace!("GET {}", url);
        let response = self
            .client
            .get(url.as_str())
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse { status, body })
    }
}
