//! `edupolicy sessions|history|reset` — inspect or clear sessions.
//!
//! Both work on the session store alone, so no API key is needed.

use edupolicy_core::session::TurnRole;

pub async fn list() -> anyhow::Result<()> {
    let config = super::load_config()?;
    let store = edupolicy_agent::bootstrap::build_store(&config).await?;
    let ids = store.session_ids().await?;
    if ids.is_empty() {
        println!("  (no sessions)");
    }
    for id in ids {
        println!("  {id}");
    }
    Ok(())
}

pub async fn history(session_id: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let store = edupolicy_agent::bootstrap::build_store(&config).await?;
    let turns = store.history(session_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!("  (no history for session {session_id})");
        return Ok(());
    }
    for turn in &turns {
        let who = match turn.role {
            TurnRole::User => "You",
            TurnRole::Assistant => "Assistant",
        };
        println!("  {who} > {}", turn.content);
    }
    Ok(())
}

pub async fn reset(session_id: &str) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let store = edupolicy_agent::bootstrap::build_store(&config).await?;
    if store.reset(session_id).await? {
        println!("  Session {session_id} cleared.");
    } else {
        println!("  Session {session_id} had no history.");
    }
    Ok(())
}
