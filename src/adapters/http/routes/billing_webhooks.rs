//! Stripe webhook handler: the ingestion edge of subscription reconciliation.

use secrecy::ExposeSecret;

use super::common::*;
use crate::{domain::entities::billing_event::BillingEvent, infra::stripe_client::StripeClient};

/// POST /api/billing/webhook
///
/// Verification failures (missing/invalid signature, malformed payload) are
/// client errors and never touch state; the provider does not retry 4xx.
/// Processing failures return 500 so the provider's own retry policy
/// redelivers the event.
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidInput("Missing Stripe signature".into()))?;

    StripeClient::verify_webhook_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
    )?;

    let event = BillingEvent::parse(&body).map_err(AppError::InvalidInput)?;

    match app_state.billing_sync.apply_event(&event).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "received": true })),
        )),
        Err(e) => {
            error!(
                error = %e,
                event_type = event.event_type(),
                "Webhook processing failed, returning 500 for Stripe retry"
            );
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/billing/webhook", post(handle_webhook))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum_test::TestServer;

    use crate::domain::entities::entitlement::EntitlementStatus;
    use crate::test_utils::{TestAppStateBuilder, create_test_user, sign_webhook_payload};

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(router().with_state(app_state)).unwrap()
    }

    fn signed(server_body: &str) -> axum::http::HeaderValue {
        sign_webhook_payload(server_body, WEBHOOK_SECRET)
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn missing_signature_returns_400() {
        let app_state = TestAppStateBuilder::new().build();

        let response = server(app_state).post("/billing/webhook").text("{}").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_signature_returns_400() {
        let app_state = TestAppStateBuilder::new().build();

        let response = server(app_state)
            .post("/billing/webhook")
            .add_header(
                axum::http::HeaderName::from_static("stripe-signature"),
                axum::http::HeaderValue::from_static("t=1,v1=deadbeef"),
            )
            .text("{}")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_payload_with_valid_signature_returns_400() {
        let app_state = TestAppStateBuilder::new().build();
        let body = "not-json";

        let response = server(app_state)
            .post("/billing/webhook")
            .add_header(
                axum::http::HeaderName::from_static("stripe-signature"),
                signed(body),
            )
            .text(body)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unrecognized_event_is_acknowledged() {
        let app_state = TestAppStateBuilder::new().build();
        let body = serde_json::json!({
            "type": "invoice.payment_succeeded",
            "data": {"object": {"id": "in_1"}}
        })
        .to_string();

        let response = server(app_state)
            .post("/billing/webhook")
            .add_header(
                axum::http::HeaderName::from_static("stripe-signature"),
                signed(&body),
            )
            .text(&body)
            .await;

        response.assert_status(StatusCode::OK);
        let json: serde_json::Value = response.json();
        assert_eq!(json["received"], true);
    }

    #[tokio::test]
    async fn subscription_update_transitions_state() {
        let user = create_test_user(|_| {});
        let (app_state, repos) = TestAppStateBuilder::new()
            .with_user(user.clone())
            .build_with_repos();

        let body = serde_json::json!({
            "type": "customer.subscription.updated",
            "data": {
                "object": {
                    "id": "sub_1",
                    "customer": "cus_1",
                    "status": "past_due",
                    "metadata": {"user_id": user.id.to_string()}
                }
            }
        })
        .to_string();

        let response = server(app_state)
            .post("/billing/webhook")
            .add_header(
                axum::http::HeaderName::from_static("stripe-signature"),
                signed(&body),
            )
            .text(&body)
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            repos.states.get(user.id).unwrap().status,
            EntitlementStatus::PastDue
        );
        assert_eq!(repos.events.all_for(user.id).len(), 1);
    }

    #[tokio::test]
    async fn store_failure_returns_500_with_error_body() {
        let user = create_test_user(|_| {});
        let (app_state, repos) = TestAppStateBuilder::new()
            .with_user(user.clone())
            .build_with_repos();
        repos.states.fail_writes(true);

        let body = serde_json::json!({
            "type": "customer.subscription.updated",
            "data": {
                "object": {
                    "id": "sub_1",
                    "customer": "cus_1",
                    "status": "active",
                    "metadata": {"user_id": user.id.to_string()}
                }
            }
        })
        .to_string();

        let response = server(app_state)
            .post("/billing/webhook")
            .add_header(
                axum::http::HeaderName::from_static("stripe-signature"),
                signed(&body),
            )
            .text(&body)
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = response.json();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn wrong_method_returns_405() {
        let app_state = TestAppStateBuilder::new().build();

        let response = server(app_state).get("/billing/webhook").await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}
