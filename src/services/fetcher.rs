// src/services/fetcher.rs

//! Single-page retrieval through the rate limiter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::utils::{RateLimiter, http};

/// How a single retrieval ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx with the response body
    Success(String),
    /// 429 Too Many Requests
    Throttled,
    /// Network error or any other status
    TransientFailure(String),
}

impl FetchOutcome {
    /// Convert into the error taxonomy, keeping `url` for context.
    pub fn into_result(self, url: &str) -> Result<String> {
        match self {
            Self::Success(body) => Ok(body),
            Self::Throttled => Err(AppError::RateLimitExceeded {
                url: url.to_string(),
            }),
            Self::TransientFailure(detail) => Err(AppError::TransientFetch {
                url: url.to_string(),
                detail,
            }),
        }
    }
}

/// Retrieves one page. Implementations do not retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// [`PageFetcher`] over HTTP, admitting every request through a shared
/// [`RateLimiter`].
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl HttpFetcher {
    pub fn new(client: Client, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    /// Build the client from `[crawler]` and share `limiter`.
    pub fn from_config(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = http::create_async_client(&config.crawler)?;
        Ok(Self::new(client, limiter))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        self.limiter.admit().await;
        log::debug!("GET {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TransientFailure(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            log::warn!("Throttled by upstream at {}", url);
            return FetchOutcome::Throttled;
        }
        if !status.is_success() {
            return FetchOutcome::TransientFailure(format!("HTTP {}", status));
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => FetchOutcome::TransientFailure(e.to_string()),
        }
    }
}
