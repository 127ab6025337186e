pub mod chat;
pub mod doctor;
pub mod query;
pub mod serve;
pub mod session;

use anyhow::Context;
use edupolicy_agent::AgentController;
use edupolicy_config::AppConfig;

/// Load and validate configuration from the default locations.
pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// Load configuration and build a ready controller.
pub async fn controller() -> anyhow::Result<AgentController> {
    let config = load_config()?;
    edupolicy_agent::build_controller(&config)
        .await
        .context("Failed to start the agent (is OPENROUTER_API_KEY set?)")
}
