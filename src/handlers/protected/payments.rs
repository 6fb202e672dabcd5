// handlers/protected/payments.rs - POST /create-checkout-session

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::payments::CheckoutRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutCreated {
    pub id: String,
    pub url: Option<String>,
}

/**
 * POST /create-checkout-session - start a premium purchase
 *
 * Opens a hosted checkout for the single lifetime premium product, stamped
 * with the caller's email so reconciliation can find the user again.
 *
 * @returns `{ id, url }` of the hosted session; gateway failures are 500
 */
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<CheckoutCreated> {
    let payments = &state.config.payments;
    let client_url = state.config.security.client_url.trim_end_matches('/');

    if payments.price_cents <= 0 {
        return Err(ApiError::internal_server_error("Premium price is not configured"));
    }

    let session = state
        .payments
        .create_checkout(CheckoutRequest {
            customer_email: auth.email.clone(),
            product_name: payments.product_name.clone(),
            unit_amount: payments.price_cents,
            currency: payments.currency.clone(),
            success_url: format!("{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}", client_url),
            cancel_url: format!("{}/payment/cancel", client_url),
        })
        .await?;

    Ok(ApiResponse::success(CheckoutCreated {
        id: session.id,
        url: session.url,
    }))
}
