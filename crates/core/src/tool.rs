//! Tool trait — the uniform contract over agent capabilities.
//!
//! Every capability (retrieval, structured query, web search, summarization)
//! takes one string and returns one string. The set of tools is closed:
//! [`ToolName`] has one variant per capability, and the model's free-text
//! tool choice is resolved through [`ToolName::from_str`], so an unknown name
//! is an ordinary error value rather than an unchecked dynamic call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use crate::error::ToolError;

/// The closed set of tools the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Retrieval over the regulations knowledge base.
    RagTool,
    /// Natural-language query against the student-records database.
    SqlTool,
    /// Keyword search on trusted web sources.
    WebTool,
    /// Condense long text into a few Vietnamese sentences.
    Summarizer,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::RagTool,
        ToolName::SqlTool,
        ToolName::WebTool,
        ToolName::Summarizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::RagTool => "rag_tool",
            ToolName::SqlTool => "sql_tool",
            ToolName::WebTool => "web_tool",
            ToolName::Summarizer => "summarizer",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ToolError::NotFound(wanted.to_string()))
    }
}

/// Static description of a tool, as shown to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: String,
}

/// The core Tool trait.
///
/// Adapters convert backend failures into descriptive strings wherever they
/// can; an `Err` is reserved for failures the adapter could not phrase itself.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which tool this is.
    fn name(&self) -> ToolName;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Run the tool on a single string input.
    async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description().to_string(),
        }
    }
}

/// A registry of available tools.
///
/// Built once by the composition root and shared read-only afterwards.
/// Tools are held by `Arc` so the controller can also call them directly.
/// Registration order is kept so the tool catalogue in the prompt is stable.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        match self.tools.iter_mut().find(|t| t.name() == name) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by its variant.
    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Resolve a free-text tool name as proposed by the model.
    pub fn lookup(&self, name: &str) -> std::result::Result<&dyn Tool, ToolError> {
        let parsed: ToolName = name.parse()?;
        self.get(parsed)
            .ok_or_else(|| ToolError::NotFound(name.trim().to_string()))
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Invoke a tool by free-text name.
    pub async fn invoke(&self, name: &str, input: &str) -> std::result::Result<String, ToolError> {
        self.lookup(name)?.invoke(input).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<ToolName> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
