//! Shared in-memory state: live sessions, open connections, and the
//! record-store slot.

/// Session lifecycle phases and transitions.
pub mod phase;
/// Registry of open real-time connections.
pub mod registry;
/// Live session data and the session table.
pub mod session;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::AppConfig,
    dao::quiz_store::QuizStore,
    error::ServiceError,
};

pub use self::phase::{InvalidTransition, SessionEvent, SessionPhase};
pub use self::registry::{Binding, ClientConnection, ConnectionRegistry, ConnectionRole};
pub use self::session::{ActiveQuestion, RosterEntry, Session, SessionTable};

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing live sessions, open connections, and the
/// record-store handle.
pub struct AppState {
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    connections: ConnectionRegistry,
    sessions: SessionTable,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            quiz_store: RwLock::new(None),
            connections: ConnectionRegistry::new(),
            sessions: SessionTable::new(),
            config: Arc::new(config),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the record store or fail with a degraded-mode error.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new record store implementation and leave degraded mode.
    pub async fn install_quiz_store(&self, store: Arc<dyn QuizStore>) {
        let mut guard = self.quiz_store.write().await;
        *guard = Some(store);
    }

    /// Remove the current record store and enter degraded mode.
    pub async fn clear_quiz_store(&self) {
        let mut guard = self.quiz_store.write().await;
        guard.take();
    }

    /// Whether the application is running without a storage backend.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.quiz_store.read().await;
        guard.is_none()
    }

    /// Registry of open real-time connections.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Table of live quiz sessions.
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }
}
