//! Read-only status projection for callers.

use crate::entities::{Purchase, PurchaseStatus};
use crate::store::{Store, StoreError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("purchase not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caller-facing projection of a purchase's canonical state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub code: i32,
    pub info: Option<String>,
}

/// Map the canonical status to the caller-facing code.
///
/// This mapping is a stable external contract: pending → 1, refunded → 3
/// (with the refund metadata as `info`), success → 5. Everything else,
/// including cancelled, reads as 1.
pub fn status_view(purchase: &Purchase) -> StatusView {
    match purchase.status {
        PurchaseStatus::Success => StatusView {
            code: 5,
            info: None,
        },
        PurchaseStatus::Refunded => StatusView {
            code: 3,
            info: purchase.commit.clone(),
        },
        _ => StatusView {
            code: 1,
            info: None,
        },
    }
}

pub struct StatusQuery {
    store: Arc<dyn Store>,
}

impl StatusQuery {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up an operation owned by `api_login`. The account's `test` flag
    /// selects the sandbox purchase table.
    pub async fn get_status(
        &self,
        api_login: &str,
        operation_id: &str,
        sandbox: bool,
    ) -> Result<StatusView, StatusError> {
        let purchase = self
            .store
            .purchase_by_id(api_login, operation_id, sandbox)
            .await?
            .ok_or(StatusError::NotFound)?;
        Ok(status_view(&purchase))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn purchase(status: PurchaseStatus, commit: Option<&str>) -> Purchase {
        let now = {
            let t = time::OffsetDateTime::now_utc();
            time::PrimitiveDateTime::new(t.date(), t.time())
        };
        Purchase {
            id: "P1".into(),
            amount: Decimal::from(50),
            steam_login: "alpha".into(),
            api_login: "shop".into(),
            status,
            qr_id: Uuid::new_v4(),
            qr_payload: "https://pay.example/p/1".into(),
            commit: commit.map(str::to_owned),
            refund_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn code_mapping_is_stable() {
        assert_eq!(status_view(&purchase(PurchaseStatus::Pending, None)).code, 1);
        assert_eq!(status_view(&purchase(PurchaseStatus::Success, None)).code, 5);
        assert_eq!(
            status_view(&purchase(PurchaseStatus::Cancelled, None)).code,
            1
        );

        let refunded = status_view(&purchase(PurchaseStatus::Refunded, Some("ref-77")));
        assert_eq!(refunded.code, 3);
        assert_eq!(refunded.info.as_deref(), Some("ref-77"));
    }

    #[tokio::test]
    async fn looks_up_by_owner_and_table() {
        let store = Arc::new(MemoryStore::new());
        store.add_purchase(purchase(PurchaseStatus::Success, None), false);
        let query = StatusQuery::new(store);

        let view = query.get_status("shop", "P1", false).await.unwrap();
        assert_eq!(view.code, 5);

        // Wrong owner and wrong table both read as not found.
        assert!(matches!(
            query.get_status("other-shop", "P1", false).await,
            Err(StatusError::NotFound)
        ));
        assert!(matches!(
            query.get_status("shop", "P1", true).await,
            Err(StatusError::NotFound)
        ));
    }
}
