use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::errors::FetchError;
use super::types::{RawDocument, SourceConfig};

/// Upper bound on any single request.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(15);

/// Retrieves the raw body of one source. Implementations never panic on
/// network trouble; every failure comes back as a `FetchError`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<RawDocument, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// `timeout` is clamped to [`MAX_TIMEOUT`]. Sources reject clients that
    /// do not send a browser-like user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout.min(MAX_TIMEOUT))
            .connect_timeout(timeout.min(MAX_TIMEOUT))
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(
        skip(self, source),
        fields(source = %source.name, url = %source.url),
        level = "debug"
    )]
    async fn fetch(&self, source: &SourceConfig) -> Result<RawDocument, FetchError> {
        let to_err = |e: reqwest::Error| FetchError::from_reqwest(&source.name, &e);

        let resp = self
            .http
            .get(&source.url)
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?;

        let body = resp.text().await.map_err(to_err)?;

        debug!(bytes = body.len(), "source fetched");

        Ok(RawDocument::new(source.name.clone(), body))
    }
}
