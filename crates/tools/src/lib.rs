//! Tool adapters for the EduPolicy agent.
//!
//! Four tools wrap four backends: regulations retrieval, the student-records
//! database, Tavily web search and a model-backed summarizer. Each adapter
//! turns backend failures into a Vietnamese sentence so the reasoning loop
//! never stops on a tool error.

pub mod rag_tool;
pub mod sql_tool;
pub mod student_db;
pub mod summarizer;
pub mod tavily;
pub mod web_tool;

use edupolicy_core::tool::ToolRegistry;
use std::sync::Arc;

pub use rag_tool::{RAG_NO_RESULTS, RAG_UNAVAILABLE, RagAnswer, RagTool};
pub use sql_tool::{SQL_NOT_CONFIGURED, SqlTool};
pub use student_db::StudentDb;
pub use summarizer::SummarizerTool;
pub use tavily::TavilyClient;
pub use web_tool::{WEB_NO_RESULTS, WEB_NOT_CONFIGURED, WebTool};

/// The four tools, shared between the registry and direct passthroughs.
#[derive(Clone)]
pub struct Toolbox {
    pub rag: Arc<RagTool>,
    pub sql: Arc<SqlTool>,
    pub web: Arc<WebTool>,
    pub summarizer: Arc<SummarizerTool>,
}

impl Toolbox {
    /// Build the registry the reasoning loop dispatches through.
    ///
    /// Registration order fixes the order of the tool catalogue in the prompt.
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(self.rag.clone());
        registry.register(self.sql.clone());
        registry.register(self.web.clone());
        registry.register(self.summarizer.clone());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edupolicy_core::backend::Embedder;
    use edupolicy_core::error::{ProviderError, ToolError};
    use edupolicy_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use edupolicy_core::tool::ToolName;

    struct Unused;

    #[async_trait]
    impl Provider for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("unused".into()))
        }
    }

    #[async_trait]
    impl Embedder for Unused {
        async fn embed_query(&self, _t: &str) -> Result<Vec<f32>, ToolError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn registry_has_all_tools_in_order() {
        let provider: Arc<dyn Provider> = Arc::new(Unused);
        let toolbox = Toolbox {
            rag: Arc::new(RagTool::new(Arc::new(Unused), None, 4)),
            sql: Arc::new(SqlTool::new(provider.clone(), "m", 0.1, None)),
            web: Arc::new(WebTool::new(None, 4)),
            summarizer: Arc::new(SummarizerTool::new(provider, "m", 0.1)),
        };
        let registry = toolbox.registry();
        assert_eq!(registry.names(), ToolName::ALL.to_vec());
        assert_eq!(
            registry.invoke("sql_tool", "bao nhiêu sinh viên?").await.unwrap(),
            SQL_NOT_CONFIGURED
        );
    }
}
