#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod checkout;
pub mod entities;
pub mod gateway;
pub mod ledger;
pub mod pool;
pub mod processors;
pub mod reconcile;
pub mod status;
pub mod store;
