//! PeriodReset processor.
//!
//! The period ceiling is a per-day window, but the counters only ever
//! accumulate; this task zeroes every client's `period_amount` at each UTC
//! midnight. The lifetime counter is untouched.

use crate::store::Store;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Fallback sleep if the next midnight cannot be computed (calendar edge).
const FALLBACK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Time left until the next UTC midnight.
pub fn until_next_reset(now: time::OffsetDateTime) -> std::time::Duration {
    let Some(next_day) = now.date().next_day() else {
        return FALLBACK_INTERVAL;
    };
    let next_midnight = next_day.midnight().assume_utc();
    (next_midnight - now).try_into().unwrap_or(FALLBACK_INTERVAL)
}

pub struct PeriodReset {
    store: Arc<dyn Store>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PeriodReset {
    pub fn new(store: Arc<dyn Store>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { store, shutdown_rx }
    }

    pub async fn run(mut self) {
        info!("PeriodReset started");

        loop {
            let wait = until_next_reset(time::OffsetDateTime::now_utc());

            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("PeriodReset received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(wait) => {
                    match self.store.reset_all_period_counters().await {
                        Ok(reset) => info!(clients = reset, "period counters reset"),
                        Err(e) => error!(error = %e, "failed to reset period counters"),
                    }
                }
            }
        }

        info!("PeriodReset shutdown complete");
    }
}
