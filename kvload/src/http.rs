//! Sends generated requests to the key-value service over HTTP.

use std::fmt::Debug;

use reqwest::StatusCode;
use url::Url;

use crate::config::Config;
use crate::error::Result;
use crate::request::Request;

/// Delivers a [`Request`] to the service and reports the response status.
///
/// Implementations must not retry or interpret the status. Non-success statuses are returned as
/// `Ok` and counted as failures by the caller.
#[async_trait::async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    /// Sends `request` and waits for the response status.
    async fn send(&self, request: &Request) -> Result<StatusCode>;
}

/// A transport using a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    /// Creates a remote for the given base URL with a default client.
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Creates a remote from the base URL and request timeout in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("kvload/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.parsed_base_url()?,
        })
    }

    /// The origin all requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Transport for HttpRemote {
    async fn send(&self, request: &Request) -> Result<StatusCode> {
        let url = request.url(&self.base_url)?;
        let response = self
            .client
            .request(request.method(), url)
            .send()
            .await?;

        let status = response.status();
        // Drain the body so the connection can go back to the pool.
        response.bytes().await?;

        Ok(status)
    }
}
