use rust_decimal::Decimal;
use uuid::Uuid;

/// Lifecycle state of a purchase.
///
/// `Pending` is the only non-terminal state: the allowed transitions are
/// pending → {success, cancelled, refunded}; everything else is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "purchase_status")]
pub enum PurchaseStatus {
    Pending,
    Success,
    Cancelled,
    Refunded,
}

impl PurchaseStatus {
    pub fn is_terminal(self) -> bool {
        self != PurchaseStatus::Pending
    }

    /// Wire name used in JSON payloads and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Success => "success",
            PurchaseStatus::Cancelled => "cancelled",
            PurchaseStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment attempt. `id` is the provider-assigned payment identifier and
/// the primary key; `amount` is in major currency units.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Purchase {
    pub id: String,
    pub amount: Decimal,
    pub steam_login: String,
    pub api_login: String,
    pub status: PurchaseStatus,
    pub qr_id: Uuid,
    /// Redirect / QR URL handed back to the caller.
    pub qr_payload: String,
    /// Refund metadata, surfaced by the status query for refunded purchases.
    pub commit: Option<String>,
    pub refund_attempts: i32,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

/// Insert payload for a freshly created payment attempt (always pending).
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub id: String,
    pub amount: Decimal,
    pub steam_login: String,
    pub api_login: String,
    pub qr_id: Uuid,
    pub qr_payload: String,
}
