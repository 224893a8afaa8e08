use super::{Counters, Store, StoreError, Transition};
use crate::entities::{ApiAccount, Client, NewClient, NewPurchase, Purchase, PurchaseStatus};
use async_trait::async_trait;
use sqlx::PgPool;

/// Live purchases table.
const PURCHASES: &str = "purchases";
/// Sandbox purchases table, written by test-flagged accounts and `/api/test`.
const PURCHASES_TEST: &str = "purchases_test";

fn purchase_table(sandbox: bool) -> &'static str {
    if sandbox { PURCHASES_TEST } else { PURCHASES }
}

/// Postgres-backed [`Store`].
///
/// Every conditional update is a single `UPDATE ... WHERE <expected state>`
/// statement; the row count tells the caller whether it won the race.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn api_client_by_key(&self, api_key: &str) -> Result<Option<ApiAccount>, StoreError> {
        let account = sqlx::query_as::<_, ApiAccount>(
            "SELECT api_login, api_key, second_server_url, test
             FROM api_clients WHERE api_key = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn api_client(
        &self,
        api_login: &str,
        api_key: &str,
    ) -> Result<Option<ApiAccount>, StoreError> {
        let account = sqlx::query_as::<_, ApiAccount>(
            "SELECT api_login, api_key, second_server_url, test
             FROM api_clients WHERE api_login = $1 AND api_key = $2",
        )
        .bind(api_login)
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn client_by_client_id(&self, client_id: &str) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT client_id, steam_login, total_amount, period_amount, created_at, updated_at
             FROM clients WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }

    async fn insert_client(&self, client: NewClient) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO clients (client_id, steam_login, total_amount, period_amount)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (client_id) DO NOTHING",
        )
        .bind(&client.client_id)
        .bind(&client.steam_login)
        .bind(client.total_amount)
        .bind(client.period_amount)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_client(&self, client_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn swap_counters(
        &self,
        client_id: &str,
        expect: Counters,
        next: Counters,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE clients
             SET total_amount = $2, period_amount = $3,
                 updated_at = (now() AT TIME ZONE 'utc')
             WHERE client_id = $1 AND total_amount = $4 AND period_amount = $5",
        )
        .bind(client_id)
        .bind(next.total)
        .bind(next.period)
        .bind(expect.total)
        .bind(expect.period)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reset_all_period_counters(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE clients
             SET period_amount = 0, updated_at = (now() AT TIME ZONE 'utc')
             WHERE period_amount <> 0",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unused_logins(&self) -> Result<Vec<String>, StoreError> {
        let logins =
            sqlx::query_scalar::<_, String>("SELECT login FROM available_logins WHERE NOT used")
                .fetch_all(&self.pool)
                .await?;
        Ok(logins)
    }

    async fn login_bound(&self, login: &str) -> Result<bool, StoreError> {
        let bound = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM clients WHERE steam_login = $1)",
        )
        .bind(login)
        .fetch_one(&self.pool)
        .await?;
        Ok(bound)
    }

    async fn claim_login(&self, login: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE available_logins SET used = TRUE WHERE login = $1 AND NOT used")
                .bind(login)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_login(&self, login: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE available_logins SET used = FALSE WHERE login = $1")
            .bind(login)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_purchase(
        &self,
        purchase: NewPurchase,
        sandbox: bool,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, amount, steam_login, api_login, status, qr_id, qr_payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO NOTHING",
            purchase_table(sandbox),
        );
        sqlx::query(&sql)
            .bind(&purchase.id)
            .bind(purchase.amount)
            .bind(&purchase.steam_login)
            .bind(&purchase.api_login)
            .bind(PurchaseStatus::Pending)
            .bind(purchase.qr_id)
            .bind(&purchase.qr_payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purchase_by_id(
        &self,
        api_login: &str,
        id: &str,
        sandbox: bool,
    ) -> Result<Option<Purchase>, StoreError> {
        let sql = format!(
            "SELECT id, amount, steam_login, api_login, status, qr_id, qr_payload,
                    \"commit\", refund_attempts, created_at, updated_at
             FROM {} WHERE api_login = $1 AND id = $2",
            purchase_table(sandbox),
        );
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(api_login)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(purchase)
    }

    async fn transition_purchase(
        &self,
        id: &str,
        to: PurchaseStatus,
    ) -> Result<Transition, StoreError> {
        let result = sqlx::query(
            "UPDATE purchases
             SET status = $2, updated_at = (now() AT TIME ZONE 'utc')
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(to)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Transition::Applied);
        }

        let current =
            sqlx::query_scalar::<_, PurchaseStatus>("SELECT status FROM purchases WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match current {
            Some(status) => Transition::AlreadyFinal(status),
            None => Transition::NotFound,
        })
    }
}
