//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{SessionManager, TokenSigner};
use crate::claims::ClaimLedger;
use crate::store::{CatchStore, ClaimStore, MemoryStore, RefreshTokenStore, UserStore};
use fishclaim_core::config::AppConfig;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Access token signer
    pub signer: TokenSigner,
    /// User lookups for the authorization gate
    pub users: Arc<dyn UserStore>,
    /// Register, login, refresh and logout flows
    pub sessions: SessionManager,
    /// Catch and claim ledger
    pub ledger: ClaimLedger,
    /// Name of the storage backend, reported by the readiness probe
    pub storage_backend: &'static str,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// State backed by a single store implementing every storage contract
    pub fn with_store<S>(config: AppConfig, store: S, storage_backend: &'static str) -> Self
    where
        S: UserStore + RefreshTokenStore + CatchStore + ClaimStore + Clone + 'static,
    {
        let signer = TokenSigner::new(&config.auth);
        let users: Arc<dyn UserStore> = Arc::new(store.clone());

        let sessions = SessionManager::new(
            users.clone(),
            Arc::new(store.clone()),
            signer.clone(),
            config.auth.clone(),
        );
        let ledger = ClaimLedger::new(Arc::new(store.clone()), Arc::new(store));

        Self {
            config,
            signer,
            users,
            sessions,
            ledger,
            storage_backend,
            start_time: Instant::now(),
        }
    }

    /// State backed by process memory
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_store(config, MemoryStore::new(), "memory")
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Ready once the storage backend answers
    pub async fn is_ready(&self) -> bool {
        match self.users.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(storage = self.storage_backend, "Readiness check failed: {}", e);
                false
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(AppConfig::default())
    }
}
