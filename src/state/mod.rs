mod sse;

use std::sync::Arc;

use tokio::sync::watch;

use crate::dao::score_store::ScoreStore;

pub use self::sse::SseHub;

/// Reference-counted handle given to every handler.
pub type SharedState = Arc<AppState>;

/// Default number of announcements buffered per SSE subscriber.
pub const DEFAULT_SSE_CAPACITY: usize = 16;

/// Central application state: the score store, the announcement hub and the stop signal.
pub struct AppState {
    store: Arc<dyn ScoreStore>,
    announcements: SseHub,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Long-lived responses end once `shutdown` turns `true` or its sender is dropped.
    pub fn new(
        store: Arc<dyn ScoreStore>,
        announcements: SseHub,
        shutdown: watch::Receiver<bool>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            announcements,
            shutdown,
        })
    }

    /// Score store selected at startup.
    pub fn store(&self) -> &Arc<dyn ScoreStore> {
        &self.store
    }

    /// Broadcast hub feeding `/v1/announcements`.
    pub fn announcements(&self) -> &SseHub {
        &self.announcements
    }

    /// Fresh handle on the process stop signal.
    pub fn shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}

/// Resolves once a stop is requested; a dropped sender counts as one.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
