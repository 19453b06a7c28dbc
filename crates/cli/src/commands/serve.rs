//! `workroom serve` - Start the HTTP API server.

use std::path::Path;

pub async fn run(
    explicit: Option<&Path>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(host) = host {
        config.gateway.host = host;
    }

    println!("🧭 Workroom Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Database:  {}", config.database.backend);
    println!("   Model:     {}", config.provider.chat_model);

    workroom_gateway::start(config).await?;
    Ok(())
}
