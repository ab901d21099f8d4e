mod health;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use kap_core::{
    build_source, spawn_poller, LogNotifier, NoPriceLookup, Notifier, PollCycle, PollStatus,
    PriceLookup, RelayConfig, SeenStore, TelegramNotifier, YahooPriceLookup,
};
use reqwest::{redirect, ClientBuilder};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kap-bot")]
#[command(about = "Relays new KAP disclosures to a Telegram chat")]
struct Cli {
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    /// Port of the health endpoint.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// JSON file with poller tunables.
    #[arg(long, env = "KAP_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "SEEN_STORE_PATH")]
    seen_store: Option<PathBuf>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    #[arg(long)]
    no_health: bool,

    /// Log messages instead of sending them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .timeout(config.request_timeout())
        .user_agent(concat!("kap-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let notifier = build_notifier(&cli, &config, client.clone())?;
    let prices: Box<dyn PriceLookup> = if config.price_lookup {
        Box::new(YahooPriceLookup::with_base(
            client.clone(),
            config.price_api_base.clone(),
        ))
    } else {
        Box::new(NoPriceLookup)
    };
    let source = build_source(config.source, config.source_url.as_deref(), client);

    let store_path = cli.seen_store.clone().unwrap_or_else(default_store_path);
    let store = SeenStore::load_from(&store_path).await;
    info!(path = %store_path.display(), seen = store.len(), source = %config.source, "seen store loaded");

    let status = PollStatus::new();
    let mut cycle = PollCycle::new(source, prices, notifier, store, config.poll_config())
        .with_status(status.clone());

    if cli.once {
        let report = cycle.poll_once().await?;
        info!(?report, "single poll cycle finished");
        return Ok(());
    }

    let poller = spawn_poller(cycle);

    let listener = if cli.no_health {
        None
    } else {
        bind_health(cli.port).await
    };
    match listener {
        Some(listener) => {
            if let Err(err) = axum::serve(listener, health::router(status))
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                warn!(error = %err, "health endpoint stopped, polling continues");
                shutdown_signal().await;
            }
        }
        None => shutdown_signal().await,
    }

    poller.stop().await?;
    info!("poller stopped");
    Ok(())
}

/// Binds the health listener. The endpoint is optional, so a busy port is
/// logged and the daemon keeps polling without it.
async fn bind_health(port: u16) -> Option<tokio::net::TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!(%addr, "health endpoint listening");
            Some(listener)
        }
        Err(err) => {
            warn!(%addr, error = %err, "cannot bind health endpoint, running without it");
            None
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn default_store_path() -> PathBuf {
    // Linux: ~/.config/kap-bot/seen_announcements.json
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("kap-bot");
    path.push("seen_announcements.json");
    path
}

fn load_config(path: Option<&std::path::Path>) -> RelayConfig {
    let Some(path) = path else {
        return RelayConfig::default();
    };
    match RelayConfig::load_from(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "using default configuration");
            RelayConfig::default()
        }
    }
}

fn build_notifier(
    cli: &Cli,
    config: &RelayConfig,
    client: reqwest::Client,
) -> anyhow::Result<Box<dyn Notifier>> {
    if cli.dry_run {
        info!("dry run, messages are logged instead of sent");
        return Ok(Box::new(LogNotifier));
    }
    let (Some(token), Some(chat_id)) = (&cli.telegram_bot_token, &cli.telegram_chat_id) else {
        bail!("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set (or pass --dry-run)");
    };
    if token.trim().is_empty() || chat_id.trim().is_empty() {
        bail!("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must not be empty");
    }
    Ok(Box::new(
        TelegramNotifier::new(client, token.trim(), chat_id.trim())
            .with_api_base(config.telegram_api_base.clone()),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("received shutdown signal, stopping");
}
