//! S3-compatible object store over plain HTTP
//!
//! Objects are addressed path-style as `{endpoint}/{bucket}/{key}`. Requests
//! are retried with exponential backoff on network failures and 5xx
//! responses; 4xx responses fail immediately.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use super::DocumentStorage;
use crate::config::StorageConfig;
use crate::utils::errors::{Result, StorageError, StorageResult};

/// Backoff settings for storage requests
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    endpoint: String,
    bucket: String,
    bearer_token: Option<String>,
    retry: RetryPolicy,
    client: Client,
}

impl S3Storage {
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            bearer_token: None,
            retry: RetryPolicy::default(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            bearer_token: config.access_token.clone().filter(|t| !t.is_empty()),
            retry: RetryPolicy {
                max_attempts: config.max_retries.max(1),
                ..RetryPolicy::default()
            },
            client,
        })
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn object_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}/{}", self.endpoint, self.bucket, encoded.join("/"))
    }

    fn request(&self, method: Method, key: &str) -> RequestBuilder {
        let req = self.client.request(method, self.object_url(key));
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send with retries; `build` is called once per attempt.
    async fn send_with_retry<F>(&self, key: &str, build: F) -> StorageResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = build().send().await;
            let retryable = match outcome {
                Ok(resp) if resp.status().is_server_error() => {
                    format!("server returned {}", resp.status())
                }
                Ok(resp) => return Ok(resp),
                Err(e) => e.to_string(),
            };

            if attempt >= self.retry.max_attempts {
                return Err(StorageError::RequestFailed(format!(
                    "{} after {} attempts: {}",
                    key, attempt, retryable
                )));
            }

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(key = %key, attempt = attempt, delay_ms = delay.as_millis() as u64, error = %retryable, "Retrying storage request");
            tokio::time::sleep(delay).await;
        }
    }

    fn rejected(key: &str, status: StatusCode) -> StorageError {
        if status == StatusCode::NOT_FOUND {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Rejected { status: status.as_u16(), key: key.to_string() }
        }
    }
}

#[async_trait]
impl DocumentStorage for S3Storage {
    fn backend(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let size = bytes.len();
        let resp = self
            .send_with_retry(key, || {
                self.request(Method::PUT, key)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes.clone())
            })
            .await?;

        if !resp.status().is_success() {
            return Err(Self::rejected(key, resp.status()));
        }

        debug!(key = %key, size = size, "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let resp = self.send_with_retry(key, || self.request(Method::GET, key)).await?;
        if !resp.status().is_success() {
            return Err(Self::rejected(key, resp.status()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let resp = self.send_with_retry(key, || self.request(Method::DELETE, key)).await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(key = %key, "Object deleted");
            return Ok(());
        }
        Err(Self::rejected(key, status))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let resp = self.send_with_retry(key, || self.request(Method::HEAD, key)).await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(Self::rejected(key, s)),
        }
    }

    fn url(&self, key: &str) -> String {
        self.object_url(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_segments() {
        let store = S3Storage::new("http://minio:9000/", "docs");
        assert_eq!(
            store.url("uploads/applicants/4/cv/a b.pdf"),
            "http://minio:9000/docs/uploads/applicants/4/cv/a%20b.pdf"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy { max_attempts: 4, base_delay: Duration::from_millis(50) };
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(200));
    }
}
