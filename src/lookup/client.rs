//! Profile lookup client

use crate::error::{Result, SniperError};
use crate::lookup::response::{classify_bulk, classify_profile};
use crate::lookup::retry::{retry, RetryForever, RetryPolicy};
use crate::lookup::NameLookup;
use crate::proxy::registry::{self, BULK_LOOKUP_LIMIT};
use crate::types::{LookupResult, LookupSettings, LookupStatus};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Wire access used by [`ProfileClient`]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;

    async fn post_json(&self, url: &str, names: &[String]) -> Result<RawResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &LookupSettings) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("username-sniper/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(settings.lane_count())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to create configured HTTP client: {}. Using default.", e);
                Client::new()
            });

        Self { client }
    }

    async fn read(response: reqwest::Response, url: &str) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            SniperError::network(e.to_string(), Some(status), Some(url.to_string()))
        })?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self.client.get(url).send().await?;
        Self::read(response, url).await
    }

    async fn post_json(&self, url: &str, names: &[String]) -> Result<RawResponse> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(names)
            .send()
            .await?;
        Self::read(response, url).await
    }
}

/// Username lookup client for the profile and bulk profile services
pub struct ProfileClient<T: Transport = HttpTransport> {
    transport: T,
    profile_url: String,
    bulk_url: String,
    single_retry: Arc<dyn RetryPolicy>,
    batch_retry: Arc<dyn RetryPolicy>,
}

impl ProfileClient<HttpTransport> {
    /// Create a client talking HTTP with the given settings
    pub fn new(settings: &LookupSettings) -> Self {
        Self::with_transport(HttpTransport::new(settings), settings)
    }
}

impl<T: Transport> ProfileClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(transport: T, settings: &LookupSettings) -> Self {
        Self {
            transport,
            profile_url: settings.profile_url.clone(),
            bulk_url: settings.bulk_url.clone(),
            single_retry: Arc::new(RetryForever::new(settings.single_retry_delay)),
            batch_retry: Arc::new(RetryForever::new(settings.batch_retry_delay)),
        }
    }

    /// Replace the retry strategies for single and batch lookups
    pub fn with_retry_policies(
        mut self,
        single: Arc<dyn RetryPolicy>,
        batch: Arc<dyn RetryPolicy>,
    ) -> Self {
        self.single_retry = single;
        self.batch_retry = batch;
        self
    }

    /// One single-lookup attempt, no retries
    pub async fn fetch_profile(&self, proxy: &str, name: &str) -> Result<LookupStatus> {
        let url = registry::profile_url(proxy, &self.profile_url, name);
        let response = self.transport.get(&url).await?;
        classify_profile(response.status, &response.body)
    }

    /// One bulk-lookup attempt, no retries
    pub async fn fetch_bulk(&self, proxy: &str, batch: &[String]) -> Result<Vec<LookupResult>> {
        if batch.len() > BULK_LOOKUP_LIMIT {
            return Err(SniperError::validation(format!(
                "A bulk lookup takes at most {} names, got {}",
                BULK_LOOKUP_LIMIT,
                batch.len()
            )));
        }

        let url = registry::bulk_url(proxy, &self.bulk_url);
        let response = self.transport.post_json(&url, batch).await?;
        classify_bulk(batch, response.status, &response.body)
    }
}

#[async_trait]
impl<T: Transport> NameLookup for ProfileClient<T> {
    async fn check_name(&self, proxy: &str, name: &str) -> LookupResult {
        let start_time = Instant::now();

        match retry(self.single_retry.as_ref(), "profile lookup", move |_| self.fetch_profile(proxy, name)).await {
            Ok(status) => {
                tracing::debug!(
                    candidate = %name,
                    status = %status,
                    duration_ms = %start_time.elapsed().as_millis(),
                    "Username check completed"
                );
                LookupResult {
                    name: name.to_string(),
                    status,
                }
            }
            Err(e) => LookupResult::transient_error(name, e.to_string()),
        }
    }

    async fn check_batch(&self, proxy: &str, batch: &[String]) -> Vec<LookupResult> {
        if batch.is_empty() {
            return Vec::new();
        }

        let start_time = Instant::now();

        match retry(self.batch_retry.as_ref(), "bulk lookup", move |_| self.fetch_bulk(proxy, batch)).await {
            Ok(results) => {
                tracing::debug!(
                    batch_len = batch.len(),
                    claimed = results.iter().filter(|r| r.is_claimed()).count(),
                    duration_ms = %start_time.elapsed().as_millis(),
                    "Batch check completed"
                );
                results
            }
            Err(e) => {
                let message = e.to_string();
                batch
                    .iter()
                    .map(|name| LookupResult::transient_error(name.clone(), message.clone()))
                    .collect()
            }
        }
    }

    fn method_name(&self) -> &'static str {
        "profile"
    }
}
