//! Clicker Back binary entrypoint wiring the score store, announcer and HTTP layers.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method},
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clicker_back::{
    config::{AppConfig, StoreBackend},
    dao::score_store::{MemoryScoreStore, ScoreStore},
    routes,
    services::{
        announcement_sinks::build_sinks,
        announcer::Announcer,
        notifier::{self, ScoreEventSink},
    },
    state::{AppState, DEFAULT_SSE_CAPACITY, SseHub},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    info!(backend = ?config.backend, "starting clicker-back");

    let (notifier, receivers) = notifier::channel(
        config.announcer.queue_capacity,
        config.announcer.overflow,
    );
    let store = build_store(config.backend, notifier.into_sink()).await?;

    let hub = SseHub::new(DEFAULT_SSE_CAPACITY);
    let sinks = build_sinks(&config.announcer, &hub);
    let (stop_tx, stop_rx) = watch::channel(false);
    let announcer = Announcer::new(&config.announcer, receivers, sinks).spawn(stop_rx.clone());

    let app_state = AppState::new(store.clone(), hub, stop_rx);
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state, &config.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    // Open SSE streams watch the same signal, so graceful shutdown never waits on them.
    let served = axum::serve(listener, service)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown requested");
            let _ = stop_tx.send(true);
        })
        .await
        .context("serving axum");

    if let Err(err) = announcer.await {
        warn!(error = %err, "announcer task failed");
    }
    store.close().await;
    info!("shutdown complete");

    served
}

/// Build the score store selected by `backend`, publishing its events to `events`.
async fn build_store(
    backend: StoreBackend,
    events: Arc<dyn ScoreEventSink>,
) -> anyhow::Result<Arc<dyn ScoreStore>> {
    match backend {
        StoreBackend::Memory => {
            info!("using in-memory score store");
            Ok(Arc::new(MemoryScoreStore::with_events(events)))
        }
        #[cfg(feature = "postgres-store")]
        StoreBackend::Postgres => {
            use clicker_back::dao::score_store::postgres::{PgConfig, PgScoreStore};

            let pg_config = PgConfig::from_env().context("reading PostgreSQL settings")?;
            let store = PgScoreStore::connect(pg_config)
                .await
                .context("connecting to PostgreSQL")?;
            info!("using PostgreSQL score store");
            Ok(Arc::new(store.with_events(events)))
        }
        #[cfg(not(feature = "postgres-store"))]
        StoreBackend::Postgres => {
            anyhow::bail!("STORE_BACKEND=postgres requires the `postgres-store` feature")
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: clicker_back::state::SharedState, allowed_origins: &[String]) -> Router<()> {
    routes::router(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Allow any origin when none are configured, otherwise only the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
