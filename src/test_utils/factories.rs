//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields as needed.

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    application::jwt,
    domain::entities::{
        billing_event::BillingEvent,
        entitlement::{EntitlementEvent, EntitlementState, EntitlementStatus},
        subject::Subject,
        user::UserProfile,
    },
};

/// Create a test user with sensible defaults.
pub fn create_test_user(overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let mut user = UserProfile {
        id: Uuid::new_v4(),
        email: Some(format!("user-{}@example.com", Uuid::new_v4().simple())),
        is_shadow: false,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

/// Create a test entitlement state with sensible defaults (active).
pub fn create_test_entitlement_state(
    user_id: Uuid,
    overrides: impl FnOnce(&mut EntitlementState),
) -> EntitlementState {
    let mut state = EntitlementState {
        user_id,
        status: EntitlementStatus::Active,
        billing_customer_id: "cus_test123".to_string(),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut state);
    state
}

/// Create a test entitlement history row with sensible defaults.
pub fn create_test_entitlement_event(
    user_id: Uuid,
    overrides: impl FnOnce(&mut EntitlementEvent),
) -> EntitlementEvent {
    let mut event = EntitlementEvent {
        id: Uuid::new_v4(),
        user_id,
        external_subscription_id: "sub_test123".to_string(),
        price_id: Some("price_test123".to_string()),
        status: EntitlementStatus::Active,
        period_start: Some(test_datetime()),
        period_end: Some(test_datetime() + chrono::Duration::days(30)),
        received_at: Some(test_datetime()),
    };
    overrides(&mut event);
    event
}

/// Create a test subject with sensible defaults.
pub fn create_test_subject(user_id: Uuid, overrides: impl FnOnce(&mut Subject)) -> Subject {
    let mut subject = Subject {
        id: Uuid::new_v4(),
        user_id,
        name: "Mathematics".to_string(),
        color: "#4f46e5".to_string(),
        exam_date: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut subject);
    subject
}

// ============================================================================
// Billing Event Helpers
// ============================================================================

/// A parsed `checkout.session.completed` event.
pub fn checkout_completed_event(
    customer_id: &str,
    subscription_id: &str,
    client_reference_id: &str,
) -> BillingEvent {
    let raw = serde_json::json!({
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "customer": customer_id,
                "subscription": subscription_id,
                "client_reference_id": client_reference_id
            }
        }
    })
    .to_string();
    BillingEvent::parse(&raw).unwrap()
}

/// A parsed `customer.subscription.{updated,deleted}` event.
pub fn subscription_event_with(
    kind: &str,
    customer_id: &str,
    subscription_id: &str,
    provider_status: &str,
) -> BillingEvent {
    let raw = serde_json::json!({
        "type": format!("customer.subscription.{kind}"),
        "data": {
            "object": {
                "id": subscription_id,
                "customer": customer_id,
                "status": provider_status
            }
        }
    })
    .to_string();
    BillingEvent::parse(&raw).unwrap()
}

/// Compute a valid `stripe-signature` header value for a raw payload.
pub fn sign_webhook_payload(payload: &str, secret: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Issue a bearer `Authorization` header for a user with the given secret.
pub fn bearer_header(user_id: Uuid, secret: &secrecy::SecretString) -> HeaderValue {
    let token = jwt::issue(user_id, secret, time::Duration::hours(1)).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Returns a consistent test datetime (2024-01-15 12:00:00 UTC).
pub fn test_datetime() -> DateTime<Utc> {
    "2024-01-15T12:00:00Z".parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_with_overrides() {
        let user = create_test_user(|u| {
            u.email = None;
            u.is_shadow = true;
        });
        assert!(user.email.is_none());
        assert!(user.is_shadow);
    }

    #[test]
    fn create_state_defaults_to_active() {
        let user_id = Uuid::new_v4();
        let state = create_test_entitlement_state(user_id, |_| {});
        assert_eq!(state.user_id, user_id);
        assert_eq!(state.status, EntitlementStatus::Active);
    }

    #[test]
    fn signed_payload_verifies() {
        use crate::infra::stripe_client::StripeClient;

        let header = sign_webhook_payload("{}", "whsec_abc");
        assert!(StripeClient::verify_webhook_signature("{}", &header, "whsec_abc").is_ok());
    }
}
