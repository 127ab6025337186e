//! `edupolicy doctor` — Report which capabilities are configured.
//!
//! Only inspects configuration and files; no backend is contacted.

use edupolicy_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    println!("EduPolicy Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = std::env::var("EDUPOLICY_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| AppConfig::config_dir().join("config.toml"));
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ℹ️  No config file at {}, using defaults", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ OpenRouter API key configured (model {})", config.llm.model);
    } else {
        println!("  ❌ No OpenRouter API key — set OPENROUTER_API_KEY (required)");
        issues += 1;
    }

    let index = config.index_path();
    if index.exists() {
        println!("  ✅ Regulation index: {}", index.display());
    } else {
        println!("  ⚠️  No regulation index at {} — rag_tool degraded", index.display());
        issues += 1;
    }

    let db = config.sqlite_path();
    if db.exists() {
        println!("  ✅ Student database: {}", db.display());
    } else {
        println!("  ⚠️  No student database at {} — sql_tool degraded", db.display());
        issues += 1;
    }

    if config.web.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
        println!("  ✅ Tavily API key configured");
    } else {
        println!("  ⚠️  No Tavily API key — web_tool degraded");
        issues += 1;
    }

    println!(
        "  ✅ Session store: {} ({})",
        config.session.backend.as_str(),
        config.session_path().display()
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
