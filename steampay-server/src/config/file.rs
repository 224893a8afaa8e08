//! TOML file configuration structures.
//!
//! These structs directly map to the `steampay-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Payment gateway credentials and callback routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API key sent to the provider as `X-Api-Key`.
    pub api_key: String,
    /// Where the provider delivers completion callbacks.
    pub callback_url: Url,
    /// Payer email forwarded on payment creation.
    #[serde(default = "default_customer_email")]
    pub customer_email: String,
}

fn default_customer_email() -> String {
    "test@mail.com".to_owned()
}

/// Spend ceilings in major currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_period_ceiling")]
    pub period_ceiling: u64,
    #[serde(default = "default_lifetime_ceiling")]
    pub lifetime_ceiling: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            period_ceiling: default_period_ceiling(),
            lifetime_ceiling: default_lifetime_ceiling(),
        }
    }
}

fn default_period_ceiling() -> u64 {
    10_000
}

fn default_lifetime_ceiling() -> u64 {
    100_000
}
