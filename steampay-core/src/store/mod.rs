//! Persistent-store abstraction.
//!
//! The store is the single source of truth for domain data; nothing is
//! cached across requests. [`Store`] exposes exactly the operations the core
//! needs, including the conditional updates the concurrency model relies on
//! (`claim_login`, `swap_counters`, `transition_purchase`). [`PgStore`] is
//! the production Postgres implementation; [`MemoryStore`] is an in-process
//! double for tests and local development.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entities::{ApiAccount, Client, NewClient, NewPurchase, Purchase, PurchaseStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A client's quota counters, read and written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub total: Decimal,
    pub period: Decimal,
}

/// Result of a conditional purchase status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The purchase was pending and is now in the requested state.
    Applied,
    /// The purchase was already terminal; nothing changed.
    AlreadyFinal(PurchaseStatus),
    NotFound,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- api_clients ---------------------------------------------------------

    async fn api_client_by_key(&self, api_key: &str) -> Result<Option<ApiAccount>, StoreError>;

    async fn api_client(
        &self,
        api_login: &str,
        api_key: &str,
    ) -> Result<Option<ApiAccount>, StoreError>;

    // -- clients -------------------------------------------------------------

    async fn client_by_client_id(&self, client_id: &str) -> Result<Option<Client>, StoreError>;

    /// Insert a new client binding. Returns `false` if a row with the same
    /// `client_id` already exists (concurrent creation race).
    async fn insert_client(&self, client: NewClient) -> Result<bool, StoreError>;

    /// Remove a client row (checkout compensation path only).
    async fn delete_client(&self, client_id: &str) -> Result<(), StoreError>;

    /// Compare-and-swap the quota counters. Succeeds only if the row still
    /// holds `expect`; returns `false` when a concurrent writer won.
    async fn swap_counters(
        &self,
        client_id: &str,
        expect: Counters,
        next: Counters,
    ) -> Result<bool, StoreError>;

    /// Zero every client's `period_amount`. Returns the number of rows reset.
    async fn reset_all_period_counters(&self) -> Result<u64, StoreError>;

    // -- available_logins ----------------------------------------------------

    async fn unused_logins(&self) -> Result<Vec<String>, StoreError>;

    /// Whether any client already holds this login as its `steam_login`.
    async fn login_bound(&self, login: &str) -> Result<bool, StoreError>;

    /// Conditionally flip `used` false→true. Returns `false` when the login
    /// was already claimed.
    async fn claim_login(&self, login: &str) -> Result<bool, StoreError>;

    /// Flip `used` back to false (checkout compensation path only).
    async fn release_login(&self, login: &str) -> Result<(), StoreError>;

    // -- purchases -----------------------------------------------------------

    /// Insert a pending purchase into the live or sandbox table. Inserting an
    /// id that already exists is a no-op.
    async fn insert_purchase(&self, purchase: NewPurchase, sandbox: bool)
    -> Result<(), StoreError>;

    async fn purchase_by_id(
        &self,
        api_login: &str,
        id: &str,
        sandbox: bool,
    ) -> Result<Option<Purchase>, StoreError>;

    /// Conditionally move a live purchase out of `pending`.
    async fn transition_purchase(
        &self,
        id: &str,
        to: PurchaseStatus,
    ) -> Result<Transition, StoreError>;
}
