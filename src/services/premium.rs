use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::database::models::PremiumGrant;
use crate::database::{DatabaseError, UserRepository};
use crate::payments::{CheckoutSession, PaymentStatus};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Checkout session {0} carries no purchaser email")]
    MissingPurchaser(String),

    #[error("No user registered as {0}")]
    UnknownUser(String),
}

/// Outcome of turning a checkout session into local premium state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl Reconciliation {
    fn already_processed(transaction_id: &str) -> Self {
        Self {
            processed: true,
            already_processed: Some(true),
            payment_status: None,
            transaction_id: Some(transaction_id.to_string()),
        }
    }

    fn granted(transaction_id: &str) -> Self {
        Self {
            processed: true,
            already_processed: Some(false),
            payment_status: Some(PaymentStatus::Paid),
            transaction_id: Some(transaction_id.to_string()),
        }
    }

    fn not_paid(status: PaymentStatus) -> Self {
        Self {
            processed: false,
            already_processed: None,
            payment_status: Some(status),
            transaction_id: None,
        }
    }
}

/// Grant premium for a paid session at most once per transaction id.
///
/// Replays (client redirect and webhook both arriving, or a reload of the
/// success page) report `alreadyProcessed` and leave the user untouched.
pub async fn reconcile(users: &dyn UserRepository, session: &CheckoutSession) -> Result<Reconciliation, ReconcileError> {
    let transaction_id = session.transaction_id();

    if users.find_by_transaction(transaction_id).await?.is_some() {
        return Ok(Reconciliation::already_processed(transaction_id));
    }

    if !session.payment_status.is_paid() {
        info!("Session {} not paid ({:?}), nothing to reconcile", session.id, session.payment_status);
        return Ok(Reconciliation::not_paid(session.payment_status));
    }

    let email = session
        .purchaser_email()
        .ok_or_else(|| ReconcileError::MissingPurchaser(session.id.clone()))?;

    match users.grant_premium(email, transaction_id).await? {
        PremiumGrant::Granted(user) => {
            info!("Granted premium to {} for transaction {}", user.email, transaction_id);
            Ok(Reconciliation::granted(transaction_id))
        }
        PremiumGrant::AlreadyProcessed => Ok(Reconciliation::already_processed(transaction_id)),
        PremiumGrant::UnknownUser => Err(ReconcileError::UnknownUser(email.to_string())),
    }
}
