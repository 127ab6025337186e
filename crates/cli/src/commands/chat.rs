//! `edupolicy chat` — Interactive or single-message chat mode.

use edupolicy_agent::{AgentController, ChatResponse};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, session: Option<String>, trace: bool) -> anyhow::Result<()> {
    let config = super::load_config()?;
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set the environment variable:");
        eprintln!("    export OPENROUTER_API_KEY='sk-or-v1-...'");
        eprintln!();
        eprintln!("  Or add it to your config file under [llm]:");
        eprintln!("    {}", edupolicy_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let controller = edupolicy_agent::build_controller(&config).await?;
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = controller.chat(&session_id, &msg).await;
        eprint!("\r              \r");
        let response = response?;
        print_response(&response, trace);
        return Ok(());
    }

    let caps = controller.capabilities();
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║      EduPolicy Assistant — Interactive Mode   ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.llm.model);
    println!("  Session:   {session_id}");
    println!(
        "  Tools:     rag_tool{} sql_tool{} web_tool{} summarizer",
        degraded(caps.retrieval),
        degraded(caps.sql),
        degraded(caps.web)
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    interactive(&controller, &session_id, trace).await?;

    println!();
    println!("  Tạm biệt!");
    println!();
    Ok(())
}

async fn interactive(controller: &AgentController, session_id: &str, trace: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let result = controller.chat(session_id, line).await;
        eprint!("\r     \r");
        match result {
            Ok(response) => {
                println!();
                print_response(&response, trace);
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }
    Ok(())
}

fn print_response(response: &ChatResponse, trace: bool) {
    if trace {
        for line in response.reasoning.iter().chain(&response.tool_interactions) {
            println!("  · {line}");
        }
        if !response.reasoning.is_empty() {
            println!();
        }
    }
    for line in response.answer.lines() {
        println!("  Assistant > {line}");
    }
}

fn degraded(enabled: bool) -> &'static str {
    if enabled { "" } else { " (degraded)" }
}
