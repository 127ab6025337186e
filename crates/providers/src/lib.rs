//! Language-model provider implementations for EduPolicy.
//!
//! All providers implement the `edupolicy_core::Provider` trait.
//! [`build_from_config`] assembles the OpenRouter client wrapped in
//! the retry policy.

pub mod embedding;
pub mod openai_compat;
pub mod retry;

pub use embedding::ProviderEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;

use edupolicy_config::AppConfig;
use edupolicy_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured chat/embedding provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn build_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn edupolicy_core::Provider>, ProviderError> {
    let api_key = config
        .require_api_key()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
    let timeout = Duration::from_secs(config.llm.timeout_secs);

    let base = OpenAiCompatProvider::openrouter(&config.llm.base_url, api_key, timeout)?;
    tracing::info!(
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        max_retries = config.llm.max_retries,
        "Language-model provider configured"
    );

    Ok(Arc::new(
        RetryProvider::new(Arc::new(base), config.llm.max_retries).with_attempt_timeout(timeout),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_api_key() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn build_with_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-or-test".into());
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }
}
