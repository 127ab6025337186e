//! Provider retry — bounded re-attempts with exponential backoff.
//!
//! Wraps any provider and re-sends a failed request when the error is
//! transient (network, timeout, rate limit, 5xx). Authentication failures
//! and other 4xx responses are returned immediately.

use async_trait::async_trait;
use edupolicy_core::error::ProviderError;
use edupolicy_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that retries its inner provider on transient failures.
pub struct RetryProvider {
    inner: Arc<dyn edupolicy_core::Provider>,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
}

impl RetryProvider {
    /// Wrap `inner`, allowing up to `max_retries` re-attempts per request.
    pub fn new(inner: Arc<dyn edupolicy_core::Provider>, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(120),
        }
    }

    /// Delay before the first retry; doubled on each subsequent one.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Upper bound for a single attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn backoff(&self, retry: u32, error: &ProviderError) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let delay = match error {
            ProviderError::RateLimited { retry_after_secs } => {
                exp.max(Duration::from_secs(*retry_after_secs))
            }
            _ => exp,
        };
        delay.min(self.max_delay)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let provider_name = self.inner.name().to_string();
        let mut retry = 0;

        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.attempt_timeout.as_secs()
                ))),
            };

            let error = match outcome {
                Ok(value) => {
                    if retry > 0 {
                        info!(provider = %provider_name, operation, retries = retry, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_transient() || retry >= self.max_retries {
                warn!(
                    provider = %provider_name,
                    operation,
                    retries = retry,
                    error = %error,
                    "Provider request failed"
                );
                return Err(error);
            }

            let delay = self.backoff(retry, &error);
            retry += 1;
            warn!(
                provider = %provider_name,
                operation,
                attempt = retry,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient provider error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl edupolicy_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.with_retry("complete", || self.inner.complete(request.clone()))
            .await
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        self.with_retry("embed", || self.inner.embed(request.clone()))
            .await
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edupolicy_core::Provider;
    use edupolicy_core::message::Message;
    use std::sync::Mutex;

    /// Fails with the scripted errors, then succeeds.
    struct FlakyProvider {
        failures: Mutex<Vec<ProviderError>>,
        call_count: Mutex<usize>,
    }

    impl FlakyProvider {
        fn new(failures: Vec<ProviderError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl edupolicy_core::Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(ProviderResponse {
                    content: "success".into(),
                    usage: None,
                    model: "test-model".into(),
                })
            } else {
                Err(failures.remove(0))
            }
        }
    }

    /// Hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl edupolicy_core::Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest::new("test", vec![Message::user("hello")])
    }

    fn server_error() -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let inner = Arc::new(FlakyProvider::new(vec![]));
        let retry = RetryProvider::new(inner.clone(), 3);

        let response = retry.complete(test_request()).await.unwrap();
        assert_eq!(response.content, "success");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::Network("conn reset".into()),
            server_error(),
        ]));
        let retry = RetryProvider::new(inner.clone(), 3);

        let response = retry.complete(test_request()).await.unwrap();
        assert_eq!(response.content, "success");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(FlakyProvider::new(vec![
            server_error(),
            server_error(),
            server_error(),
            server_error(),
        ]));
        let retry = RetryProvider::new(inner.clone(), 3);

        let err = retry.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
        // One initial attempt plus three retries
        assert_eq!(inner.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_not_retried() {
        let inner = Arc::new(FlakyProvider::new(vec![ProviderError::AuthenticationFailed(
            "bad key".into(),
        )]));
        let retry = RetryProvider::new(inner.clone(), 3);

        let err = retry.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_timeout_is_transient() {
        let retry = RetryProvider::new(Arc::new(HangingProvider), 1)
            .with_attempt_timeout(Duration::from_millis(50));

        let err = retry.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[test]
    fn backoff_doubles_and_honors_retry_after() {
        let retry = RetryProvider::new(Arc::new(FlakyProvider::new(vec![])), 3)
            .with_base_delay(Duration::from_millis(100));
        let net = ProviderError::Network("x".into());
        assert_eq!(retry.backoff(0, &net), Duration::from_millis(100));
        assert_eq!(retry.backoff(2, &net), Duration::from_millis(400));

        let limited = ProviderError::RateLimited { retry_after_secs: 7 };
        assert_eq!(retry.backoff(0, &limited), Duration::from_secs(7));
        let huge = ProviderError::RateLimited { retry_after_secs: 600 };
        assert_eq!(retry.backoff(0, &huge), Duration::from_secs(30));
    }

    #[test]
    fn name_passes_through() {
        let retry = RetryProvider::new(Arc::new(FlakyProvider::new(vec![])), 0);
        assert_eq!(retry.name(), "flaky");
        assert_eq!(retry.max_retries(), 0);
    }
}
