//! Server command implementation

use anyhow::Result;
use spendie_core::Config;

use super::open_db;

pub async fn cmd_serve(
    config: &Config,
    host: Option<&str>,
    port: Option<u16>,
    no_auth: bool,
) -> Result<()> {
    let host = host.unwrap_or(&config.server.host).to_string();
    let port = port.unwrap_or(config.server.port);

    println!("🚀 Starting Spendie web server...");
    println!("   Database: {}", config.database.display());
    println!("   Listening: http://{}:{}", host, port);

    if config.server.webhook_secret.is_some() {
        println!("   💬 Chat webhook: POST /webhook/<secret>");
    } else {
        println!("   💬 Chat webhook: disabled");
        println!("      Set SPENDIE_WEBHOOK_SECRET or server.webhook_secret to enable it");
    }

    // Comma-separated list of origins allowed to call the API from a browser
    let allowed_origins: Vec<String> = std::env::var("SPENDIE_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if no_auth {
        println!();
        println!("   ⚠️  Owner header NOT required - do not expose to network!");
        println!("      API calls without x-spendie-owner act as '{}'", config.owner);
    } else {
        println!("   🔒 API calls must send the x-spendie-owner header");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(&config.database)?;

    let server_config = spendie_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        webhook_secret: config.server.webhook_secret.clone(),
        default_owner: config.owner.clone(),
    };

    spendie_server::serve_with_config(db, config, &host, port, server_config).await?;

    Ok(())
}
