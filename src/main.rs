use anyhow::Context;
use clap::Parser;
use hookrelay::{
    Dispatcher, WebhookNotifier,
    config::{self, ConfigStore},
    server::{self, AppState},
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "HOOKRELAY_PORT", default_value = "8008")]
    port: u16,

    #[arg(short, long, env = "HOOKRELAY_BIND", default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, env = "HOOKRELAY_CONFIG", default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    /// Seconds between checks of the config file for changes, 0 to disable
    #[arg(long, env = "HOOKRELAY_WATCH_INTERVAL", default_value = "2")]
    watch_interval: u64,

    /// Seconds to wait for the chat webhook to answer
    #[arg(long, env = "HOOKRELAY_NOTIFY_TIMEOUT", default_value = "5")]
    notify_timeout: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store = Arc::new(
        ConfigStore::load(&args.config)
            .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?,
    );
    {
        let snapshot = store.current();
        info!(
            "Loaded configuration: {} groups, watching branches {:?}",
            snapshot.config.destinations.groups.len(),
            snapshot.config.branches
        );
    }

    config::spawn_reload_on_hangup(store.clone());
    if args.watch_interval > 0 {
        config::spawn_watch(store.clone(), Duration::from_secs(args.watch_interval));
    } else {
        warn!("Config file watching disabled - send SIGHUP to reload");
    }

    let notifier = WebhookNotifier::new(Duration::from_secs(args.notify_timeout))
        .context("Failed to create HTTP client")?;
    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(store, notifier),
    });
    let app = server::router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Webhook relay starting on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Webhook relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
