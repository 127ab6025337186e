//! Agent controller: the API the gateway and the CLI call.
//!
//! `chat` runs the full reasoning loop and commits the turn. The
//! `*_query` methods call one tool directly, bypassing the loop and the
//! session store.

use edupolicy_config::AppConfig;
use edupolicy_core::event::EventBus;
use edupolicy_core::provider::Provider;
use edupolicy_core::session::{SessionStore, Turn};
use edupolicy_tools::{RagAnswer, Toolbox};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::AgentError;
use crate::patterns::ReactAgent;
use crate::response::{ChatResponse, ResponseAssembler};

/// Loop and model settings for a controller.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_iterations: u32,
    pub max_parse_retries: u32,
    pub observation_max_chars: usize,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_iterations: config.agent.max_iterations,
            max_parse_retries: config.agent.max_parse_retries,
            observation_max_chars: config.agent.observation_max_chars,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Which backends are live; the rest run in degraded mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub retrieval: bool,
    pub sql: bool,
    pub web: bool,
    pub session_store: String,
}

pub struct AgentController {
    agent: ReactAgent,
    assembler: ResponseAssembler,
    store: Arc<dyn SessionStore>,
    toolbox: Toolbox,
    event_bus: Arc<EventBus>,
}

impl AgentController {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
        toolbox: Toolbox,
        settings: AgentSettings,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let agent = ReactAgent::new(
            provider,
            settings.model,
            settings.temperature,
            Arc::new(toolbox.registry()),
            event_bus.clone(),
        )
        .with_max_iterations(settings.max_iterations)
        .with_max_parse_retries(settings.max_parse_retries);
        let assembler = ResponseAssembler::new(store.clone(), event_bus.clone(), settings.observation_max_chars);

        Self { agent, assembler, store, toolbox, event_bus }
    }

    /// Run one chat turn. Nothing is stored when this returns an error.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse, AgentError> {
        info!(session_id, "Handling chat message");
        let history = self.store.history(session_id).await?;
        let result = self.agent.run(session_id, &history, message).await?;
        self.assembler.commit(session_id, message, result).await
    }

    /// Retrieve regulations directly.
    pub async fn rag_query(&self, query: &str, top_k: Option<usize>) -> RagAnswer {
        self.toolbox.rag.query(query, top_k).await
    }

    /// Ask the student-records database directly.
    pub async fn sql_query(&self, question: &str) -> String {
        self.toolbox.sql.query(question).await
    }

    /// Search the web directly.
    pub async fn web_query(&self, query: &str, max_results: Option<usize>) -> String {
        self.toolbox.web.search(query, max_results).await
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, AgentError> {
        Ok(self.store.history(session_id).await?)
    }

    /// Clear a session. Returns whether it had any history.
    pub async fn reset_session(&self, session_id: &str) -> Result<bool, AgentError> {
        let existed = self.store.reset(session_id).await?;
        info!(session_id, existed, "Session reset");
        Ok(existed)
    }

    pub async fn session_ids(&self) -> Result<Vec<String>, AgentError> {
        Ok(self.store.session_ids().await?)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            retrieval: self.toolbox.rag.is_available(),
            sql: self.toolbox.sql.is_available(),
            web: self.toolbox.web.is_available(),
            session_store: self.store.name().to_string(),
        }
    }

    /// Event bus carrying tool, parse-recovery and commit events.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}
