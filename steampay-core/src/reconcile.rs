//! Status reconciliation.
//!
//! Applies asynchronous provider callbacks onto purchase records. Delivery
//! is at-least-once and unordered, so the whole operation reduces to one
//! conditional "transition only if still pending" update: duplicates and
//! late arrivals for an already-terminal purchase are accepted as no-ops.

use crate::entities::PurchaseStatus;
use crate::store::{Store, StoreError, Transition};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The provider vocabulary is not recognised; nothing is applied.
    #[error("unknown status value: {0}")]
    UnknownStatus(String),
    #[error("purchase not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Map provider vocabulary to the canonical lifecycle state.
pub fn map_provider_status(provider_status: &str) -> Option<PurchaseStatus> {
    match provider_status.trim().to_lowercase().as_str() {
        "settlement" => Some(PurchaseStatus::Success),
        "failed" | "expired" => Some(PurchaseStatus::Cancelled),
        _ => None,
    }
}

pub struct StatusReconciler {
    store: Arc<dyn Store>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Apply one provider callback. Returns the canonical status the
    /// purchase now carries, which doubles as the acknowledgment payload.
    pub async fn apply_callback(
        &self,
        payment_id: &str,
        provider_status: &str,
    ) -> Result<PurchaseStatus, ReconcileError> {
        let target = map_provider_status(provider_status)
            .ok_or_else(|| ReconcileError::UnknownStatus(provider_status.to_owned()))?;

        match self.store.transition_purchase(payment_id, target).await? {
            Transition::Applied => {
                tracing::info!(payment_id, status = %target, "purchase reconciled");
                Ok(target)
            }
            Transition::AlreadyFinal(current) => {
                tracing::debug!(payment_id, status = %current, "duplicate callback ignored");
                Ok(target)
            }
            Transition::NotFound => Err(ReconcileError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::entities::Purchase;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn pending_purchase(id: &str) -> Purchase {
        let now = {
            let t = time::OffsetDateTime::now_utc();
            time::PrimitiveDateTime::new(t.date(), t.time())
        };
        Purchase {
            id: id.into(),
            amount: Decimal::from(50),
            steam_login: "alpha".into(),
            api_login: "shop".into(),
            status: PurchaseStatus::Pending,
            qr_id: Uuid::new_v4(),
            qr_payload: "https://pay.example/p/1".into(),
            commit: None,
            refund_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn reconciler_with(purchase: Purchase) -> (Arc<MemoryStore>, StatusReconciler) {
        let store = Arc::new(MemoryStore::new());
        store.add_purchase(purchase, false);
        (store.clone(), StatusReconciler::new(store))
    }

    #[test]
    fn provider_vocabulary_mapping() {
        assert_eq!(
            map_provider_status("settlement"),
            Some(PurchaseStatus::Success)
        );
        assert_eq!(map_provider_status("failed"), Some(PurchaseStatus::Cancelled));
        assert_eq!(
            map_provider_status("expired"),
            Some(PurchaseStatus::Cancelled)
        );
        // Normalisation: provider casing and padding are tolerated.
        assert_eq!(
            map_provider_status("  Settlement "),
            Some(PurchaseStatus::Success)
        );
        assert_eq!(map_provider_status("refund_requested"), None);
    }

    #[tokio::test]
    async fn settlement_moves_pending_to_success() {
        let (store, reconciler) = reconciler_with(pending_purchase("P1"));
        let status = reconciler.apply_callback("P1", "settlement").await.unwrap();
        assert_eq!(status, PurchaseStatus::Success);
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Success
        );
    }

    #[tokio::test]
    async fn duplicate_callback_is_an_accepted_no_op() {
        let (store, reconciler) = reconciler_with(pending_purchase("P1"));
        let first = reconciler.apply_callback("P1", "settlement").await.unwrap();
        let second = reconciler.apply_callback("P1", "settlement").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Success
        );
    }

    #[tokio::test]
    async fn terminal_state_is_sticky_under_conflicting_callbacks() {
        let (store, reconciler) = reconciler_with(pending_purchase("P1"));
        reconciler.apply_callback("P1", "settlement").await.unwrap();
        // A late "expired" must not reverse the terminal state.
        reconciler.apply_callback("P1", "expired").await.unwrap();
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Success
        );
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_and_nothing_applied() {
        let (store, reconciler) = reconciler_with(pending_purchase("P1"));
        let result = reconciler.apply_callback("P1", "unknown_value").await;
        assert!(matches!(result, Err(ReconcileError::UnknownStatus(_))));
        assert_eq!(
            store.purchase_snapshot("P1", false).unwrap().status,
            PurchaseStatus::Pending
        );
    }

    #[tokio::test]
    async fn missing_purchase_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = StatusReconciler::new(store);
        let result = reconciler.apply_callback("nope", "settlement").await;
        assert!(matches!(result, Err(ReconcileError::NotFound)));
    }
}
