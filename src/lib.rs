pub mod auth;
pub mod config;
pub mod error;
pub mod goals;
pub mod observability;
pub mod rest;
pub mod storage;
pub mod time;

use std::sync::Arc;

use auth::{SessionRegistry, UserDirectory};
use config::ServerConfig;
use goals::GoalTracker;
use storage::Storage;

/// Shared application state passed to every request handler.
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<Storage>,
    /// Monthly goal update workflow.
    pub goals: GoalTracker,
    /// User directory (login, create, password ops).
    pub users: UserDirectory,
    /// In-memory bearer-token sessions.
    pub sessions: SessionRegistry,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: Arc<ServerConfig>, storage: Arc<Storage>) -> Self {
        Self {
            goals: GoalTracker::new(storage.clone()),
            users: UserDirectory::new(storage.clone()),
            sessions: SessionRegistry::new(),
            config,
            storage,
            started_at: std::time::Instant::now(),
        }
    }
}
