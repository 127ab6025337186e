//! Regulations retrieval tool.
//!
//! Embeds the query, pulls the closest chunks from the knowledge index and
//! returns their text joined by blank lines. When the index could not be
//! loaded at startup the tool stays registered and answers with a fixed
//! unavailability notice instead.

use async_trait::async_trait;
use edupolicy_core::backend::{Embedder, KnowledgeIndex};
use edupolicy_core::error::ToolError;
use edupolicy_core::tool::{Tool, ToolName};
use std::sync::Arc;
use tracing::{info, warn};

/// Returned when the knowledge index is not loaded.
pub const RAG_UNAVAILABLE: &str =
    "Chức năng RAG tạm thời không khả dụng vì chưa tải được chỉ mục quy định.";

/// Returned when the search has zero hits.
pub const RAG_NO_RESULTS: &str = "Không tìm thấy thông tin phù hợp trong cơ sở quy định.";

/// Result of a retrieval: the joined context plus the individual snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagAnswer {
    pub context: String,
    pub snippets: Vec<String>,
}

impl RagAnswer {
    fn notice(text: impl Into<String>) -> Self {
        Self { context: text.into(), snippets: Vec::new() }
    }
}

pub struct RagTool {
    embedder: Arc<dyn Embedder>,
    index: Option<Arc<dyn KnowledgeIndex>>,
    top_k: usize,
}

impl RagTool {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Option<Arc<dyn KnowledgeIndex>>,
        top_k: usize,
    ) -> Self {
        if index.is_none() {
            warn!("Knowledge index unavailable; rag_tool runs in degraded mode");
        }
        Self { embedder, index, top_k: top_k.max(1) }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    /// Retrieve up to `top_k` passages (default from configuration).
    pub async fn query(&self, query: &str, top_k: Option<usize>) -> RagAnswer {
        let Some(index) = &self.index else {
            return RagAnswer::notice(RAG_UNAVAILABLE);
        };
        let k = top_k.filter(|k| *k > 0).unwrap_or(self.top_k);

        let embedding = match self.embedder.embed_query(query).await {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Query embedding failed");
                return RagAnswer::notice(format!("Không thể tạo vector truy vấn cho câu hỏi. Chi tiết: {e}"));
            }
        };

        let passages = match index.search(&embedding, k).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Knowledge index search failed");
                return RagAnswer::notice(format!("Truy vấn cơ sở quy định thất bại. Chi tiết: {e}"));
            }
        };

        info!(k, hits = passages.len(), "Regulations retrieved");
        if passages.is_empty() {
            return RagAnswer::notice(RAG_NO_RESULTS);
        }

        let snippets: Vec<String> = passages.into_iter().map(|p| p.text).collect();
        RagAnswer {
            context: snippets.join("\n\n"),
            snippets,
        }
    }
}

#[async_trait]
impl Tool for RagTool {
    fn name(&self) -> ToolName {
        ToolName::RagTool
    }

    fn description(&self) -> &str {
        "Use this tool to retrieve information from the university regulations. \
         Input should be a natural language question or keywords."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        Ok(self.query(input, None).await.context)
    }
}
