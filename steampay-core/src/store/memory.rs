use super::{Counters, Store, StoreError, Transition};
use crate::entities::{ApiAccount, Client, NewClient, NewPurchase, Purchase, PurchaseStatus};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory [`Store`] double.
///
/// Backs the test suites and local development; a single mutex around the
/// whole state makes each operation atomic, which is exactly the consistency
/// primitive the conditional updates assume of the real store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    api_clients: Vec<ApiAccount>,
    clients: HashMap<String, Client>,
    logins: BTreeMap<String, bool>,
    purchases: HashMap<String, Purchase>,
    purchases_test: HashMap<String, Purchase>,
}

fn utc_now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account: ApiAccount) {
        self.lock().api_clients.push(account);
    }

    pub fn add_login(&self, login: &str, used: bool) {
        self.lock().logins.insert(login.to_owned(), used);
    }

    pub fn add_client(&self, client: NewClient) {
        let now = utc_now();
        self.lock().clients.insert(
            client.client_id.clone(),
            Client {
                client_id: client.client_id,
                steam_login: client.steam_login,
                total_amount: client.total_amount,
                period_amount: client.period_amount,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Seed a fully-formed purchase row, bypassing the pending-only insert.
    pub fn add_purchase(&self, purchase: Purchase, sandbox: bool) {
        let mut inner = self.lock();
        let table = if sandbox {
            &mut inner.purchases_test
        } else {
            &mut inner.purchases
        };
        table.insert(purchase.id.clone(), purchase);
    }

    pub fn client_snapshot(&self, client_id: &str) -> Option<Client> {
        self.lock().clients.get(client_id).cloned()
    }

    pub fn login_used(&self, login: &str) -> Option<bool> {
        self.lock().logins.get(login).copied()
    }

    pub fn purchase_snapshot(&self, id: &str, sandbox: bool) -> Option<Purchase> {
        let inner = self.lock();
        let table = if sandbox {
            &inner.purchases_test
        } else {
            &inner.purchases
        };
        table.get(id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn api_client_by_key(&self, api_key: &str) -> Result<Option<ApiAccount>, StoreError> {
        Ok(self
            .lock()
            .api_clients
            .iter()
            .find(|a| a.api_key == api_key)
            .cloned())
    }

    async fn api_client(
        &self,
        api_login: &str,
        api_key: &str,
    ) -> Result<Option<ApiAccount>, StoreError> {
        Ok(self
            .lock()
            .api_clients
            .iter()
            .find(|a| a.api_login == api_login && a.api_key == api_key)
            .cloned())
    }

    async fn client_by_client_id(&self, client_id: &str) -> Result<Option<Client>, StoreError> {
        Ok(self.lock().clients.get(client_id).cloned())
    }

    async fn insert_client(&self, client: NewClient) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner.clients.contains_key(&client.client_id) {
            return Ok(false);
        }
        let now = utc_now();
        inner.clients.insert(
            client.client_id.clone(),
            Client {
                client_id: client.client_id,
                steam_login: client.steam_login,
                total_amount: client.total_amount,
                period_amount: client.period_amount,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }

    async fn delete_client(&self, client_id: &str) -> Result<(), StoreError> {
        self.lock().clients.remove(client_id);
        Ok(())
    }

    async fn swap_counters(
        &self,
        client_id: &str,
        expect: Counters,
        next: Counters,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(client) = inner.clients.get_mut(client_id) else {
            return Ok(false);
        };
        if client.total_amount != expect.total || client.period_amount != expect.period {
            return Ok(false);
        }
        client.total_amount = next.total;
        client.period_amount = next.period;
        client.updated_at = utc_now();
        Ok(true)
    }

    async fn reset_all_period_counters(&self) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let mut reset = 0;
        for client in inner.clients.values_mut() {
            if !client.period_amount.is_zero() {
                client.period_amount = rust_decimal::Decimal::ZERO;
                client.updated_at = utc_now();
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn unused_logins(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()
            .logins
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(login, _)| login.clone())
            .collect())
    }

    async fn login_bound(&self, login: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .clients
            .values()
            .any(|c| c.steam_login == login))
    }

    async fn claim_login(&self, login: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.logins.get_mut(login) {
            Some(used) if !*used => {
                *used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_login(&self, login: &str) -> Result<(), StoreError> {
        if let Some(used) = self.lock().logins.get_mut(login) {
            *used = false;
        }
        Ok(())
    }

    async fn insert_purchase(
        &self,
        purchase: NewPurchase,
        sandbox: bool,
    ) -> Result<(), StoreError> {
        let now = utc_now();
        let row = Purchase {
            id: purchase.id.clone(),
            amount: purchase.amount,
            steam_login: purchase.steam_login,
            api_login: purchase.api_login,
            status: PurchaseStatus::Pending,
            qr_id: purchase.qr_id,
            qr_payload: purchase.qr_payload,
            commit: None,
            refund_attempts: 0,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.lock();
        let table = if sandbox {
            &mut inner.purchases_test
        } else {
            &mut inner.purchases
        };
        table.entry(purchase.id).or_insert(row);
        Ok(())
    }

    async fn purchase_by_id(
        &self,
        api_login: &str,
        id: &str,
        sandbox: bool,
    ) -> Result<Option<Purchase>, StoreError> {
        let inner = self.lock();
        let table = if sandbox {
            &inner.purchases_test
        } else {
            &inner.purchases
        };
        Ok(table
            .get(id)
            .filter(|p| p.api_login == api_login)
            .cloned())
    }

    async fn transition_purchase(
        &self,
        id: &str,
        to: PurchaseStatus,
    ) -> Result<Transition, StoreError> {
        let mut inner = self.lock();
        match inner.purchases.get_mut(id) {
            None => Ok(Transition::NotFound),
            Some(purchase) if purchase.status == PurchaseStatus::Pending => {
                purchase.status = to;
                purchase.updated_at = utc_now();
                Ok(Transition::Applied)
            }
            Some(purchase) => Ok(Transition::AlreadyFinal(purchase.status)),
        }
    }
}
