//! Summarizer tool: condenses long text into a few Vietnamese sentences.

use async_trait::async_trait;
use edupolicy_core::error::ToolError;
use edupolicy_core::message::Message;
use edupolicy_core::provider::{Provider, ProviderRequest};
use edupolicy_core::tool::{Tool, ToolName};
use std::sync::Arc;
use tracing::debug;

fn summary_prompt(content: &str) -> String {
    format!(
        "Bạn là trợ lý học thuật. Hãy tóm tắt nội dung sau thành 3-4 câu ngắn gọn, \
         nêu rõ các quy định quan trọng hoặc số liệu chính.\n\nNội dung:\n{content}\n"
    )
}

pub struct SummarizerTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl SummarizerTool {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self { provider, model: model.into(), temperature }
    }
}

#[async_trait]
impl Tool for SummarizerTool {
    fn name(&self) -> ToolName {
        ToolName::Summarizer
    }

    fn description(&self) -> &str {
        "Use to summarise long pieces of text into concise Vietnamese."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        if input.trim().is_empty() {
            return Ok(String::new());
        }

        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::user(summary_prompt(input))],
        );
        request.temperature = self.temperature;

        let response = self.provider.complete(request).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: ToolName::Summarizer.to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(chars = response.content.len(), "Summary produced");
        Ok(response.content.trim().to_string())
    }
}
