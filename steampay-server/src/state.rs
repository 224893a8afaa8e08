//! Application state shared across all request handlers.

use std::sync::Arc;
use steampay_core::gateway::PaymentGateway;
use steampay_core::ledger::Limits;
use steampay_core::store::Store;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
/// Store and gateway are injected as trait objects so tests can swap in
/// doubles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Spend ceilings (can be reloaded via SIGHUP).
    pub limits: Arc<RwLock<Limits>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, limits: Limits) -> Self {
        Self {
            store,
            gateway,
            limits: Arc::new(RwLock::new(limits)),
        }
    }

    /// Snapshot of the current limits.
    pub async fn limits(&self) -> Limits {
        *self.limits.read().await
    }

    /// Update the limits (used during SIGHUP reload).
    pub async fn update_limits(&self, new_limits: Limits) {
        let mut limits = self.limits.write().await;
        *limits = new_limits;
    }
}
