//! Backend traits consumed by the tool adapters.
//!
//! Each tool wraps exactly one backend: retrieval wraps an [`Embedder`] and a
//! [`KnowledgeIndex`], structured query wraps a [`StructuredBackend`], web
//! search wraps a [`WebSearchBackend`]. Implementations live in the memory and
//! tools crates; tests substitute in-process fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ToolError;

/// A retrieved chunk of the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,

    /// Free-form chunk metadata (e.g. `{"source": "regulations.pdf", "chunk": 3}`).
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Similarity to the query, higher is closer.
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    /// The `source` metadata field, when present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Turns query text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ToolError>;
}

/// Similarity search over embedded chunks.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Number of chunks in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` passages closest to `embedding`, best first.
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<Passage>, ToolError>;
}

/// A read-only relational database.
#[async_trait]
pub trait StructuredBackend: Send + Sync {
    /// Table DDL plus a few sample rows per table, as shown to the model.
    async fn schema(&self) -> Result<String, ToolError>;

    /// Run one statement and return every row rendered as strings.
    async fn execute(&self, sql: &str) -> Result<Vec<Vec<String>>, ToolError>;
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

/// Keyword search against an external search API.
#[async_trait]
pub trait WebSearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passage_source_from_metadata() {
        let p = Passage {
            text: "Điều 5".into(),
            metadata: serde_json::json!({"source": "regulations.pdf", "chunk": 3}),
            score: 0.8,
        };
        assert_eq!(p.source(), Some("regulations.pdf"));

        let bare: Passage = serde_json::from_str(r#"{"text": "x"}"#).unwrap();
        assert_eq!(bare.source(), None);
        assert_eq!(bare.score, 0.0);
    }

    #[test]
    fn web_result_tolerates_missing_fields() {
        let r: WebResult = serde_json::from_str(r#"{"title": "MOET"}"#).unwrap();
        assert_eq!(r.title, "MOET");
        assert!(r.url.is_empty());
    }
}
