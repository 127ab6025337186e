//! Composition root: builds every backend from configuration and wires
//! them into an [`AgentController`].
//!
//! A missing LLM key is fatal. The knowledge index, the student database
//! and the web search key are optional; each missing one leaves its tool
//! registered in degraded mode.

use edupolicy_config::{AppConfig, SessionBackend};
use edupolicy_core::backend::{KnowledgeIndex, StructuredBackend, WebSearchBackend};
use edupolicy_core::error::Error;
use edupolicy_core::provider::Provider;
use edupolicy_core::session::SessionStore;
use edupolicy_memory::{InMemoryStore, JsonFileStore, JsonlKnowledgeIndex, SqliteStore};
use edupolicy_providers::ProviderEmbedder;
use edupolicy_tools::{RagTool, SqlTool, StudentDb, SummarizerTool, TavilyClient, Toolbox, WebTool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::controller::{AgentController, AgentSettings};

/// Build a controller with the configured OpenRouter provider.
pub async fn build_controller(config: &AppConfig) -> Result<AgentController, Error> {
    let provider = edupolicy_providers::build_from_config(config)?;
    build_controller_with_provider(config, provider).await
}

/// Build a controller around an existing provider.
pub async fn build_controller_with_provider(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<AgentController, Error> {
    let store = build_store(config).await?;
    let toolbox = build_toolbox(config, provider.clone()).await?;

    let controller = AgentController::new(provider, store, toolbox, AgentSettings::from_config(config));
    let caps = controller.capabilities();
    info!(
        retrieval = caps.retrieval,
        sql = caps.sql,
        web = caps.web,
        store = %caps.session_store,
        "Agent controller ready"
    );
    Ok(controller)
}

/// Open the configured conversation store.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, Error> {
    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Json => Arc::new(JsonFileStore::open(config.session_path())?),
        SessionBackend::Sqlite => {
            let path = config.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Internal(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
            Arc::new(SqliteStore::new(&path.to_string_lossy()).await?)
        }
        SessionBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

/// Build the four tools, degrading where a backend is missing.
pub async fn build_toolbox(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Toolbox, Error> {
    let index: Option<Arc<dyn KnowledgeIndex>> = match JsonlKnowledgeIndex::load(&config.index_path()) {
        Ok(Some(index)) => Some(Arc::new(index)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Knowledge index could not be loaded; retrieval disabled");
            None
        }
    };
    let embedder = Arc::new(ProviderEmbedder::new(provider.clone(), config.llm.embedding_model.clone()));

    let db: Option<Arc<dyn StructuredBackend>> = match StudentDb::open(&config.sqlite_path()).await {
        Ok(Some(db)) => Some(Arc::new(db)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Student database could not be opened; sql_tool disabled");
            None
        }
    };

    let web: Option<Arc<dyn WebSearchBackend>> = match config.web.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Some(Arc::new(
            TavilyClient::new(&config.web.base_url, key, Duration::from_secs(config.web.timeout_secs))
                .map_err(Error::Tool)?,
        )),
        _ => {
            warn!("TAVILY_API_KEY not set; web_tool disabled");
            None
        }
    };

    let model = config.llm.model.clone();
    let temperature = config.llm.temperature;
    Ok(Toolbox {
        rag: Arc::new(RagTool::new(embedder, index, config.retrieval.top_k)),
        sql: Arc::new(SqlTool::new(provider.clone(), model.clone(), temperature, db)),
        web: Arc::new(WebTool::new(web, config.web.max_results)),
        summarizer: Arc::new(SummarizerTool::new(provider, model, temperature)),
    })
}
