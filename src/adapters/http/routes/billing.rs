//! Billing routes: entitlement read, history, checkout and portal sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;

use super::common::*;
use crate::{
    domain::entities::entitlement::EntitlementStatus, infra::stripe_client::StripeClient,
};

// ============================================================================
// Types
// ============================================================================

#[derive(Serialize)]
struct EntitlementResponse {
    subscription_status: String,
    stripe_customer_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    is_active: bool,
}

#[derive(Serialize)]
struct HistoryEntryResponse {
    id: Uuid,
    external_subscription_id: String,
    price_id: Option<String>,
    status: EntitlementStatus,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct CreateCheckoutPayload {
    success_url: Option<String>,
    cancel_url: Option<String>,
}

#[derive(Serialize)]
struct CheckoutResponse {
    checkout_url: String,
}

#[derive(Deserialize)]
struct CreatePortalPayload {
    return_url: Option<String>,
}

#[derive(Serialize)]
struct PortalResponse {
    portal_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/billing/subscription
///
/// The read path of the reconciliation subsystem. A user without any record
/// reads as `inactive` with 200; a store failure returns the same shape with
/// `subscription_status: "error"` so the UI gate can tell "confirmed not
/// entitled" from "could not determine entitlement".
async fn get_subscription(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> axum::response::Response {
    match app_state.billing_sync.get_entitlement(user_id).await {
        Ok(summary) => Json(EntitlementResponse {
            subscription_status: summary.status.as_str().to_string(),
            stripe_customer_id: summary.billing_customer_id,
            current_period_start: summary.current_period_start,
            current_period_end: summary.current_period_end,
            is_active: summary.is_active,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, user_id = %user_id, "Entitlement read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "subscription_status": "error",
                    "is_active": false
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/billing/history
async fn get_history(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let events = app_state.billing_sync.get_history(user_id).await?;

    let response: Vec<HistoryEntryResponse> = events
        .into_iter()
        .map(|e| HistoryEntryResponse {
            id: e.id,
            external_subscription_id: e.external_subscription_id,
            price_id: e.price_id,
            status: e.status,
            period_start: e.period_start,
            period_end: e.period_end,
            received_at: e.received_at,
        })
        .collect();

    Ok(Json(response))
}

/// POST /api/billing/checkout
///
/// Thin session issuer: asks the provider for a hosted checkout URL. The
/// user id rides along as `client_reference_id` so the webhook can bind the
/// billing customer back to this account.
async fn create_checkout(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreateCheckoutPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .billing_sync
        .get_user(user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let email = user.email.ok_or(AppError::InvalidInput(
        "An email address is required to start checkout".into(),
    ))?;

    let origin = &app_state.config.app_origin;
    let success_url = match payload.success_url {
        Some(url) => url,
        None => origin
            .join("billing/success")
            .map_err(|e| AppError::Internal(e.to_string()))?
            .to_string(),
    };
    let cancel_url = match payload.cancel_url {
        Some(url) => url,
        None => origin
            .join("billing")
            .map_err(|e| AppError::Internal(e.to_string()))?
            .to_string(),
    };

    let stripe = StripeClient::new(
        app_state
            .config
            .stripe_secret_key
            .expose_secret()
            .to_string(),
    );

    let mut metadata = HashMap::new();
    metadata.insert("user_id".to_string(), user_id.to_string());
    let customer = stripe.get_or_create_customer(&email, Some(metadata)).await?;

    let session = stripe
        .create_checkout_session(
            &customer.id,
            &app_state.config.stripe_price_id,
            &success_url,
            &cancel_url,
            Some(&user_id.to_string()),
        )
        .await?;

    let checkout_url = session.url.ok_or(AppError::Internal(
        "Stripe checkout session missing URL".into(),
    ))?;

    Ok(Json(CheckoutResponse { checkout_url }))
}

/// POST /api/billing/portal
async fn create_portal(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreatePortalPayload>,
) -> AppResult<impl IntoResponse> {
    // The portal only makes sense for users the provider already knows.
    let summary = app_state.billing_sync.get_entitlement(user_id).await?;
    let customer_id = summary.billing_customer_id.ok_or(AppError::NotFound)?;

    let return_url = match payload.return_url {
        Some(url) => url,
        None => app_state
            .config
            .app_origin
            .join("account")
            .map_err(|e| AppError::Internal(e.to_string()))?
            .to_string(),
    };

    let stripe = StripeClient::new(
        app_state
            .config
            .stripe_secret_key
            .expose_secret()
            .to_string(),
    );

    let portal = stripe.create_portal_session(&customer_id, &return_url).await?;

    Ok(Json(PortalResponse {
        portal_url: portal.url,
    }))
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/billing/subscription", get(get_subscription))
        .route("/billing/history", get(get_history))
        .route("/billing/checkout", post(create_checkout))
        .route("/billing/portal", post(create_portal))
}

// ============================================================================
// Tests
// ============================================================================
