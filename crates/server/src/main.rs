//! Orchestrator Facade entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use orchestrator_config::load_settings;
use orchestrator_journal::{JournalConfig, StatusJournal};
use orchestrator_registry::SessionRegistry;
use orchestrator_server::{build_http_collaborators, create_router, AppState};
use orchestrator_supervisor::{DeviceProcessSupervisor, SupervisorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("ORCHESTRATOR_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing();
    tracing::info!(environment = env.as_deref().unwrap_or("default"), "starting orchestrator facade");

    let registry = Arc::new(SessionRegistry::new());
    let journal = Arc::new(StatusJournal::new(JournalConfig { retention_entries: settings.journal.retention_entries }));
    let supervisor = Arc::new(DeviceProcessSupervisor::new(SupervisorConfig::default()));
    let (transport, transcriber, llm, clip_search) = build_http_collaborators(&settings)?;

    let bind_addr = settings.server.bind_addr.clone();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let state = Arc::new(AppState::new(
        env,
        settings,
        registry.clone(),
        journal,
        supervisor,
        transport,
        transcriber,
        llm,
        clip_search,
        events_tx.clone(),
    ));

    let _reaper_shutdown = registry.spawn_reaper(state.reaper_thresholds(), events_tx);

    let reaper_state = state.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            tracing::info!(identifier = %event.identifier, reason = ?event.reason, "reaper-driven cleanup");
            if let Err(e) = reaper_state.cleanup_session(&event.identifier).await {
                tracing::warn!(identifier = %event.identifier, error = %e, "reaper-driven cleanup failed");
            }
        }
    });

    let app = create_router(state.clone());
    let addr: SocketAddr = bind_addr.parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    drain_active_sessions(&state).await;
    tracing::info!("orchestrator facade shut down");
    Ok(())
}

/// Runs `cleanup_room` for every still-active session before the process
/// exits (spec §12: graceful shutdown drains in-flight sessions).
async fn drain_active_sessions(state: &AppState) {
    let active = state.registry.list_active();
    if active.is_empty() {
        return;
    }
    tracing::info!(count = active.len(), "draining active sessions before exit");
    for session in active {
        if let Err(e) = state.cleanup_session(&session.identifier).await {
            tracing::warn!(identifier = %session.identifier, error = %e, "failed to drain session on shutdown");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orchestrator=info,tower_http=info".into());

    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().boxed()).init();
}
