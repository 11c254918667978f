#![forbid(unsafe_code)]

use junkan_core::{SystemClock, ENV_JUNKAN_LOG_LEVEL};
use junkan_server::{
    build_router, validate_startup_config_contract, AppState, LoggingMailer, ServerConfig,
};
use junkan_store::{LocalFsMediaStore, MembershipStore};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MEDIA_PUBLIC_BASE: &str = "/media";

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            std::env::var(ENV_JUNKAN_LOG_LEVEL)
                .map_err(|e| e.to_string())
                .and_then(|level| EnvFilter::try_new(level).map_err(|e| e.to_string()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = ServerConfig::from_env();
    init_tracing(config.log_json);
    validate_startup_config_contract(&config)?;

    let db_path = config.db_path.clone();
    let store = tokio::task::spawn_blocking(move || MembershipStore::open(&db_path))
        .await
        .map_err(|e| format!("store open task failed: {e}"))?
        .map_err(|e| format!("open store {}: {e}", config.db_path.display()))?;
    let rewards = store
        .seed_default_rewards()
        .map_err(|e| format!("seed rewards: {e}"))?;
    if rewards > 0 {
        info!(rewards, "seeded default reward tiers");
    }

    let media = LocalFsMediaStore::new(config.media_root.clone(), MEDIA_PUBLIC_BASE);
    let bind_addr = config.bind_addr.clone();
    let shutdown_drain = config.shutdown_drain;
    info!(
        db = %config.db_path.display(),
        media_root = %config.media_root.display(),
        "junkan-server starting"
    );
    let state = AppState::new(
        Arc::new(store),
        Arc::new(media),
        Arc::new(LoggingMailer),
        Arc::new(SystemClock),
        config,
    );
    let app = build_router(state.clone());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("junkan-server listening on {bind_addr}");
    let accepting = state.accepting_requests.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        accepting.store(false, Ordering::Relaxed);
        info!(drain_ms = shutdown_drain.as_millis() as u64, "shutdown requested");
        tokio::time::sleep(shutdown_drain).await;
    })
    .await
    .map_err(|e| format!("server failed: {e}"))
}
