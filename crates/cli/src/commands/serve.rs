//! `edupolicy serve` — Start the HTTP API server.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = super::load_config()?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let controller = edupolicy_agent::build_controller(&config).await?;
    let caps = controller.capabilities();
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    println!("EduPolicy Gateway");
    println!("   Listening:  http://{addr}");
    println!("   Model:      {}", config.llm.model);
    println!("   Retrieval:  {}", on_off(caps.retrieval));
    println!("   SQL:        {}", on_off(caps.sql));
    println!("   Web search: {}", on_off(caps.web));
    println!("   Sessions:   {}", caps.session_store);

    let mut events = controller.event_bus().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(event = ?event, "Domain event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    edupolicy_gateway::serve(Arc::new(controller), &addr).await?;
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "degraded" }
}
