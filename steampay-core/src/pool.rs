//! Login pool: exclusive, race-safe assignment of pool resources to clients.

use crate::store::{Store, StoreError};
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No login passed both the unused check and the binding cross-check.
    #[error("no available logins left")]
    Exhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct LoginPool {
    store: Arc<dyn Store>,
}

impl LoginPool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pick one unused login and claim it.
    ///
    /// The `used` flag can be stale relative to client bindings, so every
    /// candidate is cross-checked against existing `steam_login` values
    /// before the conditional claim. A candidate that fails either check is
    /// discarded and another one is drawn; losing the claim race is not a
    /// hard failure.
    pub async fn allocate(&self) -> Result<String, PoolError> {
        let mut candidates = self.store.unused_logins().await?;

        while !candidates.is_empty() {
            let idx = rand::rng().random_range(0..candidates.len());
            let candidate = candidates.swap_remove(idx);

            if self.store.login_bound(&candidate).await? {
                tracing::debug!(login = %candidate, "unused flag stale, login already bound");
                continue;
            }
            if self.store.claim_login(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(login = %candidate, "lost claim race, drawing another candidate");
        }

        Err(PoolError::Exhausted)
    }

    /// Return a claimed login to the pool (checkout compensation).
    pub async fn release(&self, login: &str) -> Result<(), StoreError> {
        self.store.release_login(login).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::entities::NewClient;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn pool_with_logins(logins: &[&str]) -> (Arc<MemoryStore>, LoginPool) {
        let store = Arc::new(MemoryStore::new());
        for login in logins {
            store.add_login(login, false);
        }
        (store.clone(), LoginPool::new(store))
    }

    #[tokio::test]
    async fn allocates_and_marks_used() {
        let (store, pool) = pool_with_logins(&["alpha"]);
        let login = pool.allocate().await.unwrap();
        assert_eq!(login, "alpha");
        assert_eq!(store.login_used("alpha"), Some(true));
    }

    #[tokio::test]
    async fn exhausted_when_all_used() {
        let store = Arc::new(MemoryStore::new());
        store.add_login("alpha", true);
        store.add_login("beta", true);
        let pool = LoginPool::new(store);
        assert!(matches!(pool.allocate().await, Err(PoolError::Exhausted)));
    }

    #[tokio::test]
    async fn skips_logins_already_bound_to_a_client() {
        // "alpha" is marked unused in the pool table but a client already
        // holds it; the cross-check must discard it.
        let (store, pool) = pool_with_logins(&["alpha", "beta"]);
        store.add_client(NewClient {
            client_id: "c1".into(),
            steam_login: "alpha".into(),
            total_amount: Decimal::ZERO,
            period_amount: Decimal::ZERO,
        });

        let login = pool.allocate().await.unwrap();
        assert_eq!(login, "beta");
        assert_eq!(store.login_used("alpha"), Some(false));
    }

    #[tokio::test]
    async fn exhausted_when_every_unused_login_is_bound() {
        let (store, pool) = pool_with_logins(&["alpha"]);
        store.add_client(NewClient {
            client_id: "c1".into(),
            steam_login: "alpha".into(),
            total_amount: Decimal::ZERO,
            period_amount: Decimal::ZERO,
        });
        assert!(matches!(pool.allocate().await, Err(PoolError::Exhausted)));
    }

    #[tokio::test]
    async fn concurrent_allocations_never_share_a_login() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..4 {
            store.add_login(&format!("login-{i}"), false);
        }
        let store2: Arc<MemoryStore> = store.clone();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store2.clone();
            handles.push(tokio::spawn(async move {
                LoginPool::new(store).allocate().await
            }));
        }

        let mut granted = HashSet::new();
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(login) => assert!(granted.insert(login), "login granted twice"),
                Err(PoolError::Exhausted) => exhausted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(granted.len(), 4);
        assert_eq!(exhausted, 4);
    }
}
