//! Query embedding through a provider's `/embeddings` endpoint.

use async_trait::async_trait;
use edupolicy_core::backend::Embedder;
use edupolicy_core::error::ToolError;
use edupolicy_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;

/// Adapts a [`Provider`] into an [`Embedder`] for a fixed model.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ToolError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| ToolError::BackendUnavailable(format!("embedding failed: {e}")))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::BackendUnavailable("embedding response was empty".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edupolicy_core::error::ProviderError;
    use edupolicy_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    struct FixedEmbeddings(Vec<Vec<f32>>);

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("no chat".into()))
        }

        async fn embed(&self, r: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse { embeddings: self.0.clone(), model: r.model })
        }
    }

    #[tokio::test]
    async fn returns_first_embedding() {
        let embedder = ProviderEmbedder::new(Arc::new(FixedEmbeddings(vec![vec![1.0, 0.0]])), "e5");
        assert_eq!(embedder.embed_query("học bổng").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn empty_response_is_backend_error() {
        let embedder = ProviderEmbedder::new(Arc::new(FixedEmbeddings(vec![])), "e5");
        let err = embedder.embed_query("x").await.unwrap_err();
        assert!(matches!(err, ToolError::BackendUnavailable(_)));
    }
}
