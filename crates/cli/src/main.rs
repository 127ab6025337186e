//! EduPolicy CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway
//! - `chat`     — Interactive chat or single-message mode
//! - `sessions` — List known sessions
//! - `history`  — Print a session's stored turns
//! - `reset`    — Clear a session
//! - `rag`      — Query the regulation index directly
//! - `sql`      — Ask the student-records database directly
//! - `web`      — Search the web directly
//! - `doctor`   — Report which capabilities are configured

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "edupolicy",
    about = "EduPolicy — ReAct assistant for university regulations",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session to continue; a fresh one is generated when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Also print the reasoning trace and tool interactions
        #[arg(long)]
        trace: bool,
    },

    /// List known sessions
    Sessions,

    /// Print the stored turns of a session
    History {
        session: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear a session's history
    Reset { session: String },

    /// Query the regulation index directly
    Rag {
        query: String,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Ask the student-records database a question
    Sql { question: String },

    /// Search the web
    Web {
        query: String,

        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Diagnose configuration and backends
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(host, port).await?,
        Commands::Chat { message, session, trace } => {
            commands::chat::run(message, session, trace).await?
        }
        Commands::Sessions => commands::session::list().await?,
        Commands::History { session, json } => commands::session::history(&session, json).await?,
        Commands::Reset { session } => commands::session::reset(&session).await?,
        Commands::Rag { query, top_k } => commands::query::rag(&query, top_k).await?,
        Commands::Sql { question } => commands::query::sql(&question).await?,
        Commands::Web { query, max_results } => commands::query::web(&query, max_results).await?,
        Commands::Doctor => commands::doctor::run()?,
    }

    Ok(())
}
