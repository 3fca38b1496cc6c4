use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_cookie_store::CookieStoreMutex;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

#[derive(Clone)]
pub struct HttpClient {
    pub client: ClientWithMiddleware,
    pub cookies: Arc<CookieStoreMutex>,
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("unexpected status: {0}")]
    Status(StatusCode),
}

impl HttpClient {
    pub fn new() -> reqwest::Result<HttpClient> {
        let cookies = Arc::new(CookieStoreMutex::default());
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client, cookies })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(DownloadError::Status(resp.status()));
        }

        resp.text().await.map_err(|e| e.into())
    }
}

/// Raw page download, no interpretation of the body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page_text(&self, url: &str) -> Result<String, DownloadError>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page_text(&self, url: &str) -> Result<String, DownloadError> {
        debug!("Fetching {}", url);
        self.fetch_text(url).await
    }
}
