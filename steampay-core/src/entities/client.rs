use rust_decimal::Decimal;

/// One logical downstream client, identified by a caller-supplied opaque key.
///
/// `steam_login` is assigned from the login pool exactly once and never
/// reassigned while the row exists. Counters are in major currency units.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Client {
    pub client_id: String,
    pub steam_login: String,
    /// Lifetime cumulative spend, monotonic.
    pub total_amount: Decimal,
    /// Cumulative spend within the current accounting period.
    pub period_amount: Decimal,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

/// Insert payload for a brand-new client binding.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub client_id: String,
    pub steam_login: String,
    pub total_amount: Decimal,
    pub period_amount: Decimal,
}
