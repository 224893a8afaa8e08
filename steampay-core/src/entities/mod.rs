pub mod api_client;
pub mod client;
pub mod login;
pub mod purchase;

pub use api_client::ApiAccount;
pub use client::{Client, NewClient};
pub use login::AvailableLogin;
pub use purchase::{NewPurchase, Purchase, PurchaseStatus};
