//! Remote module fetching.

mod cache;

pub use cache::ModuleCache;

use crate::graph::LoadResponse;
use crate::version::user_agent;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Remote fetch failures.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Module cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of remote module bodies.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Fetch `url`. `Ok(None)` means the server has no such module.
    async fn fetch(&self, url: &Url) -> Result<Option<LoadResponse>, FetchError>;
}

/// HTTP fetcher for remote modules.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeouts.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, FetchError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { http })
    }

    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Option<LoadResponse>, FetchError> {
        tracing::debug!(url = %url, "Fetch");

        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // The final URL after redirects identifies the module
        let specifier = response.url().to_string();
        let content = response.text().await.map_err(request_error)?;
        Ok(Some(LoadResponse::new(specifier, content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status {
            url: "https://esm.sh/x".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "https://esm.sh/x returned status 500");
    }
}
