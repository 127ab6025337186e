//! Errors that end a chat turn without committing it.

use edupolicy_core::error::{ProviderError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model backend failed after its retry budget.
    #[error("Model backend failed: {0}")]
    Backend(#[from] ProviderError),

    /// The model kept replying in a format the loop cannot parse.
    #[error("Model produced {attempts} malformed replies in a row (last: {last_reason})")]
    MalformedOutput { attempts: u32, last_reason: String },

    #[error("Session store failed: {0}")]
    Store(#[from] StoreError),
}

impl AgentError {
    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Backend(_) => "backend",
            AgentError::MalformedOutput { .. } => "malformed_output",
            AgentError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_kind() {
        let err = AgentError::MalformedOutput { attempts: 3, last_reason: "empty reply".into() };
        assert!(err.to_string().contains("3 malformed replies"));
        assert_eq!(err.kind(), "malformed_output");

        let err: AgentError = ProviderError::Timeout("60s".into()).into();
        assert_eq!(err.kind(), "backend");
    }
}
