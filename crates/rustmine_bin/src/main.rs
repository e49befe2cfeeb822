use anyhow::Result;
use rustmine_bin::{MinecraftServer, ServerConfig};
use tracing::{info, warn};

/// Config file read when `RUSTMINE_CONFIG` does not name another one.
const DEFAULT_CONFIG_PATH: &str = "server.json";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with a custom format
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_max_level(tracing::Level::DEBUG)
        .compact()
        .init();

    let config = load_config();

    // Start the Minecraft server
    let server = MinecraftServer::bind(config).await?;
    server.run().await?;

    Ok(())
}

fn load_config() -> ServerConfig {
    let path = std::env::var("RUSTMINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    if !std::path::Path::new(&path).exists() {
        info!("[STARTUP] No config at {path}, using defaults");
        return ServerConfig::default();
    }

    match ServerConfig::from_json_file(&path) {
        Ok(config) => {
            info!("[STARTUP] Loaded config from {path}");
            config
        }
        Err(e) => {
            warn!("[STARTUP] Could not load {path} ({e}), using defaults");
            ServerConfig::default()
        }
    }
}
