pub mod openai;

use crate::error::ProviderError;
use std::future::Future;
use std::time::Duration;

#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Ok text may still be empty; callers treat that as a failed attempt.
    async fn generate(&self, prompt: &str, backend_id: &str, augmented: bool) -> Result<String, ProviderError>;
}

#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Returns text expected, but not guaranteed, to be a JSON object.
    async fn classify(&self, prompt: &str, backend_id: &str) -> Result<String, ProviderError>;
}

/// Expiry is reported as `ProviderError::Timeout` like any other backend failure.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(limit, call).await {
        Ok(r) => r,
        Err(_) => Err(ProviderError::Timeout(limit.as_secs())),
    }
}
