use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{MonitorError, Result};
use crate::regions::Region;

const JSON: &str = "application/json";

/// Default overall timeout of a single request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable configuration of a [`MonitorClient`]
///
/// # Example
///
/// ```rust
/// use sysdig_monitor_api::{ClientConfig, Region};
/// use std::time::Duration;
///
/// let config = ClientConfig::for_region(Region::EuDe, "my-api-key")
///     .with_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.endpoint().as_str(), "https://eu-de.monitoring.cloud.ibm.com/");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    endpoint: Url,
    api_key: String,
    timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for an explicit endpoint
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a configuration for one of the known regions
    pub fn for_region(region: Region, api_key: impl Into<String>) -> Self {
        Self::new(region.url(), api_key)
    }

    /// Replace the endpoint
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Replace the endpoint with a known region
    pub fn with_region(self, region: Region) -> Self {
        self.with_endpoint(region.url())
    }

    /// Set the overall request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL of the API
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Overall request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the monitoring REST API
///
/// Every operation is a single request/response round trip. The client holds
/// no mutable state, so one instance can be cloned and shared freely between
/// tasks.
///
/// # Example
///
/// ```rust,no_run
/// use sysdig_monitor_api::{ClientConfig, MonitorClient, Region};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = MonitorClient::new(ClientConfig::for_region(Region::UsSouth, "my-api-key"))?;
///     let cancel = CancellationToken::new();
///
///     let alerts = client.list_alerts(&cancel).await?;
///     println!("{} alerts", alerts.alerts.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MonitorClient {
    client: ClientWithMiddleware,
    config: ClientConfig,
}

impl MonitorClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MonitorError::BuildHttpClient)?;

        let client = ClientBuilder::new(client).build();

        Ok(Self { client, config })
    }

    /// Create a new client with a custom reqwest middleware client
    ///
    /// The timeout of `config` is not applied; the supplied client's own
    /// settings are used instead.
    pub fn with_client(client: ClientWithMiddleware, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base API URL
    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// Send a request and decode the JSON response into `T`
    ///
    /// `DELETE` requests never decode the body and yield `None`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let url = self.url(path)?;
        with_cancellation(cancel, self.exchange(method, url, body)).await
    }

    /// Send a request whose successful response always carries a body
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<T> {
        self.send(method, path, body, cancel).await?.ok_or_else(|| {
            MonitorError::InvalidResource(format!("{path} yields no response body"))
        })
    }

    /// Send a request and discard whatever the API answers on success
    pub(crate) async fn send_discarding(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.url(path)?;

        let exchange = async { self.execute(method, url, body).await.map(|_| ()) };

        with_cancellation(cancel, exchange).await
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Option<T>> {
        let is_delete = method == Method::DELETE;
        let response = self.execute(method, url, body).await?;
        if is_delete {
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| MonitorError::Request(err.into()))?;

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(MonitorError::Decode)
    }

    async fn execute(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Response> {
        debug!(method = %method, url = %url, "Sending request to monitoring API");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, JSON);

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSON).body(body);
        }

        let response = request.send().await.map_err(MonitorError::Request)?;
        let status = response.status();

        if status.as_u16() < 200 || status.as_u16() >= 400 {
            warn!(status = status.as_u16(), "Monitoring API returned an error status");
            return Err(MonitorError::Api {
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), "Monitoring API request succeeded");
        Ok(response)
    }

    fn url(&self, path: &str) -> Result<Url> {
        let url = format!(
            "{}{}",
            self.config.endpoint.as_str().trim_end_matches('/'),
            path
        );

        Url::parse(&url).map_err(|source| MonitorError::InvalidUrl { url, source })
    }
}

impl Debug for MonitorClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Serialize a request body
pub(crate) fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(MonitorError::Serialize)
}

async fn with_cancellation<T>(
    cancel: &CancellationToken,
    exchange: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Monitoring API request cancelled");
            Err(MonitorError::Cancelled)
        }
        result = exchange => result,
    }
}
