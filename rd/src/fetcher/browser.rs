//! Browserless-backed page fetcher
//!
//! Fetches fully-rendered search pages through a Browserless `/content`
//! endpoint: the service loads the page in a real browser, waits out the
//! delayed-content render, and returns the final HTML.

use std::time::Duration;

use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::Url;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::extract::ExtractedPage;

use super::parse::parse_results;
use super::{FetchError, PageFetcher};

pub struct BrowserFetcher {
    client: reqwest::Client,
    content_endpoint: String,
    search_url: String,
    render_wait_ms: u64,
}

impl BrowserFetcher {
    /// Build a fetcher from configuration.
    ///
    /// The service token, when configured, is read from the environment at
    /// construction so it never lives in the config file.
    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        let mut content_endpoint = format!("{}/content", config.browserless_url.trim_end_matches('/'));
        if let Ok(token) = std::env::var(&config.token_env) {
            content_endpoint.push_str(&format!("?token={token}"));
        }

        Ok(Self {
            client,
            content_endpoint,
            search_url: config.search_url.clone(),
            render_wait_ms: config.render_wait_ms,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, query: &str) -> Result<ExtractedPage, FetchError> {
        let target = Url::parse_with_params(&self.search_url, &[("query", query)])
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        debug!(%query, url = %target, "BrowserFetcher: requesting rendered page");

        // waitForTimeout gives client-side result sections time to render
        // before the HTML snapshot is taken.
        let body = serde_json::json!({
            "url": target.as_str(),
            "waitForTimeout": self.render_wait_ms,
        });

        let resp = self
            .client
            .post(&self.content_endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        debug!(%query, html_len = html.len(), "BrowserFetcher: page rendered");

        Ok(parse_results(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FetcherConfig {
        FetcherConfig {
            browserless_url: "http://localhost:3000/".to_string(),
            token_env: "RANKDAEMON_TEST_NO_SUCH_TOKEN".to_string(),
            search_url: "https://search.naver.com/search.naver".to_string(),
            timeout_ms: 5_000,
            render_wait_ms: 100,
        }
    }

    #[test]
    fn test_from_config_strips_trailing_slash() {
        let fetcher = BrowserFetcher::from_config(&test_config()).unwrap();
        assert_eq!(fetcher.content_endpoint, "http://localhost:3000/content");
    }

    #[test]
    fn test_search_url_encodes_query() {
        let fetcher = BrowserFetcher::from_config(&test_config()).unwrap();
        let url = Url::parse_with_params(&fetcher.search_url, &[("query", "flower delivery 서울")]).unwrap();
        assert!(url.as_str().starts_with("https://search.naver.com/search.naver?query=flower"));
        assert!(!url.as_str().contains(' '));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_network_error() {
        let mut config = test_config();
        // Reserved port with nothing listening; connection is refused fast
        config.browserless_url = "http://127.0.0.1:9".to_string();
        config.timeout_ms = 500;

        let fetcher = BrowserFetcher::from_config(&config).unwrap();
        match fetcher.fetch("coffee").await {
            Err(FetchError::Network(_)) => {}
            other => panic!("Expected network error, got {other:?}"),
        }
    }
}
