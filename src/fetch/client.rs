// src/fetch/client.rs
use crate::fetch::{detail_url, RenderedPage};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;

const FETCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
// Short on purpose: most keys are invalid and a slow page is usually a dead one.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(5);
// Lets client-side rendering finish before the markup is read.
const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Source of rendered markup for one key.
///
/// One navigation plus at most one retry, a bounded wait per navigation, and a
/// settle delay before the markup is returned.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: u64, base_url: &str) -> Result<RenderedPage, FetchError>;
}

/// Fetches detail pages over HTTP, optionally through a prerender endpoint
/// that returns the page after its scripts ran.
///
/// The client (and its connection pool) is the scan's session: built once per
/// run and reused for every key.
pub struct HttpFetcher {
    client: reqwest::Client,
    render_endpoint: Option<String>,
    timeout: Duration,
    settle_delay: Duration,
}

impl HttpFetcher {
    pub fn new(render_endpoint: Option<String>) -> Result<Self, FetchError> {
        Self::with_timing(render_endpoint, NAVIGATION_TIMEOUT, SETTLE_DELAY)
    }

    pub fn with_timing(
        render_endpoint: Option<String>,
        timeout: Duration,
        settle_delay: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(FETCH_USER_AGENT)
            .build()?;
        Ok(Self { client, render_endpoint, timeout, settle_delay })
    }

    /// URL actually requested for a page: the page itself, or the page behind
    /// the render endpoint (`{endpoint}{page_url}`).
    fn request_url(&self, page_url: &str) -> String {
        match &self.render_endpoint {
            Some(endpoint) => format!("{}{}", endpoint, page_url),
            None => page_url.to_string(),
        }
    }

    async fn navigate(&self, url: &str) -> Result<String, FetchError> {
        let classify = |err: reqwest::Error| {
            if err.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Network(err)
            }
        };

        let response = self.client
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        // Client-side routes can answer 404 and still render the club, so only
        // the markup decides. A server error carries no page.
        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Http { status, url: url.to_string() });
        }
        if !status.is_success() {
            tracing::debug!("HTTP {} for {}, reading markup anyway", status, url);
        }

        response.text().await.map_err(classify)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: u64, base_url: &str) -> Result<RenderedPage, FetchError> {
        let url = detail_url(base_url, key);
        let target = self.request_url(&url);

        let markup = match self.navigate(&target).await {
            Ok(markup) => markup,
            Err(_) => self.navigate(&target).await?,
        };

        tokio::time::sleep(self.settle_delay).await;
        tracing::trace!("Fetched {} ({} bytes)", url, markup.len());

        Ok(RenderedPage { key, url, markup })
    }
}
