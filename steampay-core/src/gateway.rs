//! Payment gateway client.
//!
//! A thin adapter to the external payment provider: one request per
//! checkout, bounded by a 20-second timeout, never retried. The provider
//! answers with its own payment id and a redirect URL; everything else in
//! its response is ignored.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use url::Url;

/// Outbound request timeout mandated for the gateway call.
const GATEWAY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered but refused to create the payment.
    #[error("gateway rejected the payment: {0}")]
    Rejected(String),
    #[error("gateway returned a malformed response")]
    MalformedResponse,
    #[error("amount is not representable for the gateway")]
    InvalidAmount,
}

/// A successfully created payment link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    /// Provider-assigned payment identifier.
    pub payment_id: String,
    /// Redirect / QR URL for the payer.
    pub payment_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment link for `amount` (major units) at the account's
    /// gateway endpoint.
    async fn create_payment(
        &self,
        endpoint: &str,
        amount: Decimal,
    ) -> Result<GatewayPayment, GatewayError>;
}

/// Provider credentials and callback routing, from server configuration.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_key: String,
    pub callback_url: Url,
    pub customer_email: String,
}

pub struct HttpGateway {
    http: reqwest::Client,
    settings: GatewaySettings,
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(GATEWAY_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    data: Option<GatewayData>,
}

#[derive(Debug, Deserialize)]
struct GatewayData {
    id: Option<String>,
    payment_url: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_payment(
        &self,
        endpoint: &str,
        amount: Decimal,
    ) -> Result<GatewayPayment, GatewayError> {
        let amount = amount.to_f64().ok_or(GatewayError::InvalidAmount)?;
        let body = serde_json::json!({
            "amount": amount,
            "customer_email": self.settings.customer_email,
            "callback_url": self.settings.callback_url,
        });

        let response = self
            .http
            .post(endpoint)
            .header("X-Api-Key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let envelope: GatewayEnvelope = response.json().await?;
        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "unknown gateway error".to_owned());
            tracing::warn!(%message, "gateway rejected payment creation");
            return Err(GatewayError::Rejected(message));
        }

        let data = envelope.data.ok_or(GatewayError::MalformedResponse)?;
        match (data.id, data.payment_url) {
            (Some(payment_id), Some(payment_url)) => Ok(GatewayPayment {
                payment_id,
                payment_url,
            }),
            _ => Err(GatewayError::MalformedResponse),
        }
    }
}
