//! Checkout orchestration.
//!
//! Composes the quota ledger, the login pool and the payment gateway to
//! fulfil one order request. Amounts arrive in minor currency units; the
//! counters and the gateway work in major units (`amount / 100`).
//!
//! Quota and client mutations are committed before the gateway call; if the
//! gateway then fails, the orchestrator compensates (counters restored, a
//! freshly created client deleted and its login released) so that quota is
//! never consumed for a payment that was never created.

use crate::entities::{ApiAccount, Client, NewClient, NewPurchase};
use crate::gateway::{GatewayError, PaymentGateway};
use crate::ledger::{self, LedgerError, Limits, LimitScope, QuotaLedger, Reservation};
use crate::pool::{LoginPool, PoolError};
use crate::store::{Counters, Store, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("no available logins left")]
    PoolExhausted,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The client row vanished mid-request.
    #[error("client not found: {0}")]
    ClientNotFound(String),
}

impl From<PoolError> for CheckoutError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted => CheckoutError::PoolExhausted,
            PoolError::Store(e) => CheckoutError::Store(e),
        }
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ClientNotFound(id) => CheckoutError::ClientNotFound(id),
            LedgerError::Store(e) => CheckoutError::Store(e),
        }
    }
}

/// A successfully created checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCreated {
    pub operation_id: String,
    pub qr_id: Uuid,
    pub qr_link: String,
}

/// Outcome of a checkout request. A declined quota is a normal business
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Created(PaymentCreated),
    Declined {
        scope: LimitScope,
        remaining: Decimal,
    },
}

/// Caller-facing decline message. The Russian wording is a contract with
/// downstream integrations and must not change.
pub fn decline_info(scope: LimitScope, remaining: Decimal) -> String {
    let window = match scope {
        LimitScope::Period => "день",
        LimitScope::Lifetime => "месяц",
    };
    format!("Превышен лимит суммы операций за {window}. Остаточный лимит {remaining} рублей.")
}

pub struct CheckoutOrchestrator {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    limits: Limits,
}

impl CheckoutOrchestrator {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, limits: Limits) -> Self {
        Self {
            store,
            gateway,
            limits,
        }
    }

    /// Fulfil one checkout. `amount_minor` has been validated positive.
    pub async fn checkout(
        &self,
        account: &ApiAccount,
        client_id: &str,
        amount_minor: Decimal,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let amount = amount_minor / Decimal::ONE_HUNDRED;

        match self.store.client_by_client_id(client_id).await? {
            Some(client) => self.checkout_existing(account, &client, amount).await,
            None => self.checkout_new(account, client_id, amount).await,
        }
    }

    async fn checkout_existing(
        &self,
        account: &ApiAccount,
        client: &Client,
        amount: Decimal,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let ledger = QuotaLedger::new(self.store.clone(), self.limits);
        let (previous, next) = match ledger.reserve(&client.client_id, amount).await? {
            Reservation::Denied { scope, remaining } => {
                tracing::info!(
                    client_id = %client.client_id,
                    ?scope,
                    %remaining,
                    "checkout declined by quota"
                );
                return Ok(CheckoutOutcome::Declined { scope, remaining });
            }
            Reservation::Approved { previous, next } => (previous, next),
        };

        match self
            .create_and_record(account, &client.steam_login, amount)
            .await
        {
            Ok(created) => Ok(CheckoutOutcome::Created(created)),
            Err(err) => {
                self.restore_counters(&client.client_id, previous, next)
                    .await;
                Err(err)
            }
        }
    }

    async fn checkout_new(
        &self,
        account: &ApiAccount,
        client_id: &str,
        amount: Decimal,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // Same arithmetic as an existing client, from a zero base.
        let base = Counters {
            total: Decimal::ZERO,
            period: Decimal::ZERO,
        };
        if let Reservation::Denied { scope, remaining } = ledger::check(base, amount, self.limits) {
            return Ok(CheckoutOutcome::Declined { scope, remaining });
        }

        let pool = LoginPool::new(self.store.clone());
        let login = pool.allocate().await?;

        let inserted = match self
            .store
            .insert_client(NewClient {
                client_id: client_id.to_owned(),
                steam_login: login.clone(),
                total_amount: amount,
                period_amount: amount,
            })
            .await
        {
            Ok(inserted) => inserted,
            Err(err) => {
                self.release_login(&pool, &login).await;
                return Err(err.into());
            }
        };
        if !inserted {
            // A concurrent request created this client first; hand the login
            // back and go through the existing-client path against its row.
            self.release_login(&pool, &login).await;
            let client = self
                .store
                .client_by_client_id(client_id)
                .await?
                .ok_or_else(|| CheckoutError::ClientNotFound(client_id.to_owned()))?;
            return self.checkout_existing(account, &client, amount).await;
        }

        tracing::info!(client_id, login = %login, "new client bound to pool login");

        match self.create_and_record(account, &login, amount).await {
            Ok(created) => Ok(CheckoutOutcome::Created(created)),
            Err(err) => {
                if let Err(e) = self.store.delete_client(client_id).await {
                    tracing::warn!(client_id, error = %e, "failed to roll back new client");
                }
                self.release_login(&pool, &login).await;
                Err(err)
            }
        }
    }

    /// Gateway call plus the canonical purchase record.
    async fn create_and_record(
        &self,
        account: &ApiAccount,
        steam_login: &str,
        amount: Decimal,
    ) -> Result<PaymentCreated, CheckoutError> {
        let payment = self
            .gateway
            .create_payment(&account.second_server_url, amount)
            .await?;

        let qr_id = Uuid::new_v4();
        self.store
            .insert_purchase(
                NewPurchase {
                    id: payment.payment_id.clone(),
                    amount,
                    steam_login: steam_login.to_owned(),
                    api_login: account.api_login.clone(),
                    qr_id,
                    qr_payload: payment.payment_url.clone(),
                },
                account.test,
            )
            .await?;

        Ok(PaymentCreated {
            operation_id: payment.payment_id,
            qr_id,
            qr_link: payment.payment_url,
        })
    }

    /// Best-effort counter rollback after a failed gateway call. Conditional
    /// on the values this request wrote: if another request has moved the
    /// counters since, the rollback is skipped and logged.
    async fn restore_counters(&self, client_id: &str, previous: Counters, written: Counters) {
        match self.store.swap_counters(client_id, written, previous).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(client_id, "counters moved concurrently, rollback skipped");
            }
            Err(e) => {
                tracing::warn!(client_id, error = %e, "failed to roll back counters");
            }
        }
    }

    async fn release_login(&self, pool: &LoginPool, login: &str) {
        if let Err(e) = pool.release(login).await {
            tracing::warn!(login, error = %e, "failed to release login");
        }
    }
}
