use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use papyrus_config::ConfigManager;
use papyrus_server::logging::init_logging;
use papyrus_server::{run_server, AppState};

#[derive(Parser, Debug, Clone)]
#[command(name = "papyrus-server")]
#[command(about = "Papyrus chat backend with PDF document context")]
#[command(version)]
struct Cli {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// LLM API base URL (overrides config)
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// LLM model name (overrides config)
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Config file path
    #[arg(long, env = "PAPYRUS_CONFIG", default_value = "~/.papyrus/config.json")]
    config: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = papyrus_config::expand_tilde(&cli.config)
        .unwrap_or_else(|| std::path::PathBuf::from(&cli.config));

    let config_manager = match ConfigManager::load(&config_path).await {
        Ok(cm) => cm,
        Err(e) => {
            eprintln!("Failed to load config from {:?}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    // CLI 参数覆盖配置文件
    let overrides = cli.clone();
    let updated = config_manager
        .update(move |config| {
            if let Some(host) = overrides.host {
                config.server.host = host;
            }
            if let Some(port) = overrides.port {
                config.server.port = port;
            }
            if let Some(url) = overrides.llm_base_url {
                config.llm.base_url = url;
            }
            if let Some(model) = overrides.model {
                config.llm.model = model;
            }
        })
        .await;
    if let Err(e) = updated {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    let config = config_manager.snapshot().await;

    let log_level = cli.log_level.clone().unwrap_or_else(|| {
        if cli.debug {
            "debug".to_string()
        } else {
            config.logging.level.to_string()
        }
    });
    init_logging(&log_level);

    tracing::info!("Config loaded from {:?}", config_manager.path());
    tracing::info!("LLM Configuration:");
    tracing::info!("  Base URL: {}", config.llm.base_url);
    tracing::info!("  Model: {}", config.llm.model);
    tracing::info!("  Timeout: {}s", config.llm.timeout_seconds);
    if let Some(temperature) = config.llm.temperature {
        tracing::info!("  Temperature: {}", temperature);
    }
    if let Some(max_tokens) = config.llm.max_tokens {
        tracing::info!("  Max tokens: {}", max_tokens);
    }
    tracing::debug!("  Max upload: {} bytes", config.server.max_upload_bytes);
    tracing::debug!("  CORS: {}", config.server.cors);

    let api_key = match config.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::from_config(&config, api_key) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize server state: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = state.chat.validate_provider().await {
        tracing::error!("LLM provider configuration is invalid: {}", e);
        std::process::exit(1);
    }

    let addr: SocketAddr = match config.bind_address() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let cleanup = state.sessions().spawn_cleanup();

    if let Err(e) = run_server(state, addr).await {
        tracing::error!("Server error: {}", e);
        cleanup.abort();
        std::process::exit(1);
    }
    cleanup.abort();
}
