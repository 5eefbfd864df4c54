use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bantay", version, about = "Bantay — realtime dispatch operations console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the dispatch console
    Tui,
    /// Show current configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Tui) => bantay_tui::run().await,
        Some(Commands::Status) => {
            let cfg = bantay_client::config::load_config()?;
            println!("Bantay v{}", env!("CARGO_PKG_VERSION"));
            println!("Server: {}", cfg.server.url);
            println!(
                "Auth token: {}",
                if cfg.server.auth_token.is_some() || std::env::var("BANTAY_TOKEN").is_ok() {
                    "configured"
                } else {
                    "not set"
                }
            );
            println!(
                "Backoff: {}ms base, {}ms max, attempts {}",
                cfg.realtime.base_delay_ms,
                cfg.realtime.max_delay_ms,
                match cfg.realtime.max_attempts {
                    Some(n) => n.to_string(),
                    None => "unbounded".to_string(),
                }
            );
            println!(
                "Heartbeat: every {}s, timeout {}s",
                cfg.realtime.heartbeat_interval_secs, cfg.realtime.heartbeat_timeout_secs
            );
            println!(
                "Alert cap: {}",
                match cfg.realtime.max_alerts {
                    Some(n) => n.to_string(),
                    None => "unbounded".to_string(),
                }
            );
            println!("Config: {}", bantay_client::config::config_path().display());
            Ok(())
        }
    }
}
