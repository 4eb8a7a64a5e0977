//! HTTP transport used to reach the gateway.
//!
//! The session layer only needs two operations: a POST carrying a JSON body
//! and a bodiless GET for long-polling. Both resolve to the status code and
//! the complete response body. [`ReqwestTransport`] is the native
//! implementation; tests provide scripted ones.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

/// Header sent with every command.
pub const CONTENT_TYPE_JSON: (&str, &str) = ("Content-Type", "application/json");

/// A complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only a plain 200 counts as success for the gateway API.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Network level failure: the request never produced a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Other(String),
}

/// Minimal async HTTP client.
pub trait HttpTransport: Send + Sync {
    /// Issue a GET and collect the full response.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;

    /// Issue a POST with the given headers and body and collect the full response.
    fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// A [`reqwest`] backed [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Build a client that gives up on requests after `timeout`.
    ///
    /// Long-poll requests are held open by the gateway for up to 30 seconds,
    /// so the timeout should be comfortably larger than that.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    async fn collect(builder: reqwest::RequestBuilder) -> Result<HttpResponse, TransportError> {
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Self::collect(self.inner.get(url)).boxed()
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        let mut builder = self.inner.post(url);
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        Self::collect(builder.body(body)).boxed()
    }
}
