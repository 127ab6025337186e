//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use edupolicy_core::error::{ProviderError, ToolError};
use edupolicy_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use edupolicy_core::tool::{Tool, ToolName};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue.
/// Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider from plain text replies.
    pub fn texts<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let next = self.replies.lock().unwrap().pop_front();
        let Some(reply) = next else {
            panic!("SequentialMockProvider: no more replies (call #{call})");
        };
        reply.map(|content| ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A JSON action blob, fenced the way models usually send it.
pub fn action_reply(tool: &str, input: &str) -> String {
    format!(
        "Thought: cần dùng công cụ\n```json\n{}\n```",
        serde_json::json!({"action": tool, "action_input": input})
    )
}

/// A JSON final-answer blob.
pub fn final_reply(answer: &str) -> String {
    serde_json::json!({"action": "Final Answer", "action_input": answer}).to_string()
}

/// A tool that returns a fixed output and counts invocations.
pub struct CountingTool {
    name: ToolName,
    output: Result<String, String>,
    calls: AtomicUsize,
}

impl CountingTool {
    pub fn new(name: ToolName, output: &str) -> Self {
        Self { name, output: Ok(output.into()), calls: AtomicUsize::new(0) }
    }

    pub fn failing(name: ToolName, reason: &str) -> Self {
        Self { name, output: Err(reason.into()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> ToolName {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name.to_string(),
            reason,
        })
    }
}
