//! Quota ledger: per-client spend counters and ceiling enforcement.

use crate::store::{Counters, Store, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Spend ceilings in major currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub period_ceiling: Decimal,
    pub lifetime_ceiling: Decimal,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            period_ceiling: Decimal::from(10_000_u32),
            lifetime_ceiling: Decimal::from(100_000_u32),
        }
    }
}

/// Which ceiling a denied reservation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Period,
    Lifetime,
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Approved {
        /// Counters as they were before this reservation (compensation input).
        previous: Counters,
        next: Counters,
    },
    Denied {
        scope: LimitScope,
        /// How much headroom is left under the violated ceiling, clamped at 0.
        remaining: Decimal,
    },
}

/// Pure ceiling check over a counter snapshot.
///
/// The period check takes precedence when both ceilings are violated.
pub fn check(current: Counters, amount: Decimal, limits: Limits) -> Reservation {
    let next = Counters {
        total: current.total + amount,
        period: current.period + amount,
    };
    if next.period > limits.period_ceiling {
        Reservation::Denied {
            scope: LimitScope::Period,
            remaining: (limits.period_ceiling - current.period).max(Decimal::ZERO),
        }
    } else if next.total > limits.lifetime_ceiling {
        Reservation::Denied {
            scope: LimitScope::Lifetime,
            remaining: (limits.lifetime_ceiling - current.total).max(Decimal::ZERO),
        }
    } else {
        Reservation::Approved {
            previous: current,
            next,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The client row disappeared between lookup and reservation.
    #[error("client not found: {0}")]
    ClientNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct QuotaLedger {
    store: Arc<dyn Store>,
    limits: Limits,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn Store>, limits: Limits) -> Self {
        Self { store, limits }
    }

    /// Reserve `amount` (major units) against an existing client's counters.
    ///
    /// The decision and the counter write are one conditional swap keyed on
    /// the values this request read; a lost swap re-reads and re-decides, so
    /// two concurrent reservations can never both pass a ceiling on stale
    /// counters.
    pub async fn reserve(
        &self,
        client_id: &str,
        amount: Decimal,
    ) -> Result<Reservation, LedgerError> {
        loop {
            let client = self
                .store
                .client_by_client_id(client_id)
                .await?
                .ok_or_else(|| LedgerError::ClientNotFound(client_id.to_owned()))?;
            let current = Counters {
                total: client.total_amount,
                period: client.period_amount,
            };

            let reservation = check(current, amount, self.limits);
            let Reservation::Approved { previous, next } = reservation else {
                return Ok(reservation);
            };

            if self.store.swap_counters(client_id, previous, next).await? {
                return Ok(reservation);
            }
            tracing::debug!(client_id, "counter swap lost, re-reading");
        }
    }
}
