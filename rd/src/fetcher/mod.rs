//! Page fetching for rank checks
//!
//! The scheduler only depends on the [`PageFetcher`] contract: given a search
//! query, produce the rendered page's [`ExtractedPage`] or fail with a
//! [`FetchError`]. The production implementation ([`BrowserFetcher`]) drives a
//! Browserless-style rendering service and parses the returned HTML; tests
//! substitute a mock.

mod browser;
mod parse;

pub use browser::BrowserFetcher;
pub use parse::parse_results;

use async_trait::async_trait;
use thiserror::Error;

use crate::extract::ExtractedPage;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Render service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid search URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Fetches the rendered results page for a search query.
///
/// Implementations must normalize missing page sections to empty lists
/// rather than failing; a [`FetchError`] means the page itself could not be
/// retrieved or rendered.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<ExtractedPage, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock page fetcher for unit tests.
    ///
    /// Plays back a scripted sequence of outcomes (`None` = fetch failure),
    /// repeating the last one once exhausted, and records every query.
    pub struct MockPageFetcher {
        script: Vec<Option<ExtractedPage>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockPageFetcher {
        pub fn new(script: Vec<Option<ExtractedPage>>) -> Self {
            Self {
                script,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// A fetcher that always returns the same page
        pub fn always(page: ExtractedPage) -> Self {
            Self::new(vec![Some(page)])
        }

        /// A fetcher that always fails
        pub fn failing() -> Self {
            Self::new(vec![None])
        }

        pub fn queries(&self) -> Vec<String> {
            self.calls.lock().expect("mock fetcher mutex poisoned").clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().expect("mock fetcher mutex poisoned").len()
        }
    }

    #[async_trait]
    impl PageFetcher for MockPageFetcher {
        async fn fetch(&self, query: &str) -> Result<ExtractedPage, FetchError> {
            let mut calls = self.calls.lock().expect("mock fetcher mutex poisoned");
            let index = calls.len().min(self.script.len().saturating_sub(1));
            calls.push(query.to_string());

            match self.script.get(index) {
                Some(Some(page)) => Ok(page.clone()),
                Some(None) => Err(FetchError::Network("mock fetch failure".to_string())),
                None => Ok(ExtractedPage::default()),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_plays_back_script_and_repeats_last() {
            let page = ExtractedPage::default();
            let fetcher = MockPageFetcher::new(vec![Some(page.clone()), None]);

            assert!(fetcher.fetch("first").await.is_ok());
            assert!(fetcher.fetch("second").await.is_err());
            // Script exhausted: the last outcome repeats
            assert!(fetcher.fetch("third").await.is_err());

            assert_eq!(fetcher.queries(), vec!["first", "second", "third"]);
        }

        #[tokio::test]
        async fn test_empty_script_returns_empty_pages() {
            let fetcher = MockPageFetcher::new(vec![]);
            let page = fetcher.fetch("anything").await.unwrap();
            assert!(page.ads.is_empty());
            assert!(page.organic.is_empty());
        }
    }
}
