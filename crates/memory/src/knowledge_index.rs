//! JSONL knowledge index — the prebuilt regulations corpus.
//!
//! Each line is one embedded chunk:
//!
//! ```json
//! {"text": "Điều 12. Học bổng khuyến khích...", "metadata": {"source": "regulations.pdf", "chunk": 12}, "embedding": [0.01, ...]}
//! ```
//!
//! The index is produced offline by the ingestion pipeline and loaded whole
//! into memory; search is an exact cosine scan.

use crate::vector::{self, Chunk};
use async_trait::async_trait;
use edupolicy_core::backend::{KnowledgeIndex, Passage};
use edupolicy_core::error::ToolError;
use std::path::Path;
use tracing::{debug, info, warn};

/// An in-memory index loaded from a JSONL file.
pub struct JsonlKnowledgeIndex {
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl JsonlKnowledgeIndex {
    /// Load the index at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist; the caller runs
    /// retrieval in degraded mode. Corrupted lines and chunks whose
    /// dimension differs from the first chunk are skipped with a warning.
    pub fn load(path: &Path) -> Result<Option<Self>, ToolError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Knowledge index not found; retrieval disabled");
                return Ok(None);
            }
            Err(e) => {
                return Err(ToolError::BackendUnavailable(format!(
                    "failed to read knowledge index {}: {e}",
                    path.display()
                )));
            }
        };

        let mut chunks = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Chunk>(line) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => warn!(line = line_no + 1, error = %e, "Skipping corrupted index line"),
            }
        }

        let index = Self::from_chunks(chunks);
        info!(
            path = %path.display(),
            chunks = index.chunks.len(),
            dimension = index.dimension.unwrap_or(0),
            "Knowledge index loaded"
        );
        Ok(Some(index))
    }

    /// Build an index from chunks already in memory.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let dimension = chunks.first().map(|c| c.embedding.len());
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .filter(|c| {
                let ok = Some(c.embedding.len()) == dimension;
                if !ok {
                    warn!(
                        expected = dimension.unwrap_or(0),
                        got = c.embedding.len(),
                        "Skipping chunk with mismatched embedding dimension"
                    );
                }
                ok
            })
            .collect();
        Self { chunks, dimension }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl KnowledgeIndex for JsonlKnowledgeIndex {
    fn len(&self) -> usize {
        self.chunks.len()
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<Passage>, ToolError> {
        if let Some(dim) = self.dimension
            && dim != embedding.len()
        {
            return Err(ToolError::InvalidInput(format!(
                "query embedding has dimension {}, index expects {dim}",
                embedding.len()
            )));
        }
        let passages = vector::top_k(&self.chunks, embedding, k);
        debug!(k, hits = passages.len(), "Knowledge index search");
        Ok(passages)
    }
}
