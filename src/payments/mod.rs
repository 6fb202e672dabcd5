use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod stripe;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Payment gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid payment gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

/// What the gateway needs to open a hosted checkout for one purchase
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub product_name: String,
    pub unit_amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted checkout session as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl CheckoutSession {
    /// Idempotency key for reconciliation: the payment intent, else the session id
    pub fn transaction_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    /// Purchaser email, preferring the metadata stamped at creation
    pub fn purchaser_email(&self) -> Option<&str> {
        self.metadata
            .get("email")
            .map(String::as_str)
            .or(self.customer_email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }
}

/// Hosted checkout provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;
}
