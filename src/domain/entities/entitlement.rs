use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::billing_event::BillingEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entitlement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    Active,
    PastDue,
    Canceled,
    Inactive,
    /// Never produced by event processing; surfaced by the read path when the
    /// store cannot be consulted, so callers can tell "not entitled" from
    /// "could not determine entitlement".
    Error,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Active => "active",
            EntitlementStatus::PastDue => "past_due",
            EntitlementStatus::Canceled => "canceled",
            EntitlementStatus::Inactive => "inactive",
            EntitlementStatus::Error => "error",
        }
    }

    /// Map a provider-side subscription status onto the local status.
    ///
    /// Anything the mapping does not recognize lands on `Inactive` - access is
    /// never granted for an unknown provider status.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" | "trialing" => EntitlementStatus::Active,
            "past_due" | "unpaid" => EntitlementStatus::PastDue,
            "canceled" => EntitlementStatus::Canceled,
            _ => EntitlementStatus::Inactive,
        }
    }

    /// Pure transition function: the status a billing event moves a user to,
    /// or `None` when the event kind carries no transition (unrecognized
    /// events are acknowledged but inert).
    ///
    /// Events are applied in arrival order. The previously stored status does
    /// not gate the transition, so a stale redelivery can overwrite a newer
    /// state; callers log the old status alongside the new one instead.
    pub fn from_event(event: &BillingEvent) -> Option<Self> {
        match event {
            BillingEvent::CheckoutCompleted(_) => Some(EntitlementStatus::Active),
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                Some(Self::from_provider(&sub.status))
            }
            BillingEvent::Unrecognized { .. } => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EntitlementStatus::Active)
    }
}

impl std::fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current-state record: the single authoritative row per user consulted for
/// access decisions.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementState {
    pub user_id: Uuid,
    pub status: EntitlementStatus,
    pub billing_customer_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One row of the append-only history ledger. Used for reporting, never for
/// access decisions.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_subscription_id: String,
    pub price_id: Option<String>,
    pub status: EntitlementStatus,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewEntitlementEvent {
    pub user_id: Uuid,
    pub external_subscription_id: String,
    pub price_id: Option<String>,
    pub status: EntitlementStatus,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::billing_event::{CheckoutSessionPayload, SubscriptionPayload};

    fn subscription_event(status: &str) -> BillingEvent {
        BillingEvent::SubscriptionUpdated(SubscriptionPayload {
            id: "sub_123".to_string(),
            customer: "cus_123".to_string(),
            status: status.to_string(),
            current_period_start: None,
            current_period_end: None,
            items: None,
            metadata: Default::default(),
        })
    }

    #[test]
    fn provider_active_and_trialing_map_to_active() {
        assert_eq!(
            EntitlementStatus::from_provider("active"),
            EntitlementStatus::Active
        );
        assert_eq!(
            EntitlementStatus::from_provider("trialing"),
            EntitlementStatus::Active
        );
    }

    #[test]
    fn provider_past_due_and_unpaid_map_to_past_due() {
        assert_eq!(
            EntitlementStatus::from_provider("past_due"),
            EntitlementStatus::PastDue
        );
        assert_eq!(
            EntitlementStatus::from_provider("unpaid"),
            EntitlementStatus::PastDue
        );
    }

    #[test]
    fn provider_canceled_maps_to_canceled() {
        assert_eq!(
            EntitlementStatus::from_provider("canceled"),
            EntitlementStatus::Canceled
        );
    }

    #[test]
    fn unknown_provider_statuses_map_to_inactive() {
        for status in ["incomplete", "incomplete_expired", "paused", "", "ACTIVE"] {
            assert_eq!(
                EntitlementStatus::from_provider(status),
                EntitlementStatus::Inactive,
                "expected inactive for provider status {status:?}"
            );
        }
    }

    #[test]
    fn checkout_completed_transitions_to_active() {
        let event = BillingEvent::CheckoutCompleted(CheckoutSessionPayload {
            customer: Some("cus_123".to_string()),
            subscription: Some("sub_123".to_string()),
            client_reference_id: None,
            customer_email: None,
            customer_details: None,
            metadata: Default::default(),
        });
        assert_eq!(
            EntitlementStatus::from_event(&event),
            Some(EntitlementStatus::Active)
        );
    }

    #[test]
    fn subscription_events_follow_provider_status() {
        assert_eq!(
            EntitlementStatus::from_event(&subscription_event("past_due")),
            Some(EntitlementStatus::PastDue)
        );
        assert_eq!(
            EntitlementStatus::from_event(&subscription_event("canceled")),
            Some(EntitlementStatus::Canceled)
        );
        assert_eq!(
            EntitlementStatus::from_event(&subscription_event("paused")),
            Some(EntitlementStatus::Inactive)
        );
    }

    #[test]
    fn unrecognized_events_carry_no_transition() {
        let event = BillingEvent::Unrecognized {
            event_type: "invoice.paid".to_string(),
        };
        assert_eq!(EntitlementStatus::from_event(&event), None);
    }

    #[test]
    fn only_active_grants_access() {
        assert!(EntitlementStatus::Active.is_active());
        assert!(!EntitlementStatus::PastDue.is_active());
        assert!(!EntitlementStatus::Canceled.is_active());
        assert!(!EntitlementStatus::Inactive.is_active());
        assert!(!EntitlementStatus::Error.is_active());
    }
}
