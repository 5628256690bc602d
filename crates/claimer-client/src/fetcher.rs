use std::time::Duration;

use claimer_core::config::DEFAULT_USER_AGENT;
use claimer_core::error::AppError;
use claimer_core::traits::Fetcher;
use reqwest::{Client, StatusCode};

/// HTTP fetcher using reqwest.
///
/// Downloads raw page bodies with a fixed User-Agent and timeout. A 404 maps
/// to [`AppError::NotFound`], which ends collection pagination; any other
/// non-success status is an [`AppError::HttpError`].
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_settings(DEFAULT_USER_AGENT, Duration::from_secs(30))
    }

    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}
