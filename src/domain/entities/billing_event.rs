//! Typed billing events parsed from the payment provider's webhook payloads.
//!
//! The provider delivers a loosely-shaped JSON envelope; this module narrows
//! it into a closed set of known event kinds plus an `Unrecognized` variant
//! that is acknowledged without any state transition, so the provider does
//! not treat the delivery as a failure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionPayload),
    SubscriptionUpdated(SubscriptionPayload),
    SubscriptionDeleted(SubscriptionPayload),
    Unrecognized { event_type: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionPayload {
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub client_reference_id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub items: Option<SubscriptionItems>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItems {
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: ItemPrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemPrice {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl BillingEvent {
    /// Parse a raw webhook body into a typed event.
    ///
    /// A body that is not a `{type, data:{object}}` envelope, or whose object
    /// does not match the shape its event type promises, is a parse failure.
    /// Unknown event types parse successfully into `Unrecognized`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| format!("Invalid webhook payload: {}", e))?;

        let event = match envelope.event_type.as_str() {
            "checkout.session.completed" => {
                BillingEvent::CheckoutCompleted(Self::object(&envelope)?)
            }
            "customer.subscription.updated" => {
                BillingEvent::SubscriptionUpdated(Self::object(&envelope)?)
            }
            "customer.subscription.deleted" => {
                BillingEvent::SubscriptionDeleted(Self::object(&envelope)?)
            }
            _ => BillingEvent::Unrecognized {
                event_type: envelope.event_type.clone(),
            },
        };
        Ok(event)
    }

    fn object<T: for<'de> Deserialize<'de>>(envelope: &Envelope) -> Result<T, String> {
        serde_json::from_value(envelope.data.object.clone())
            .map_err(|e| format!("Malformed {} payload: {}", envelope.event_type, e))
    }

    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => "checkout.session.completed",
            BillingEvent::SubscriptionUpdated(_) => "customer.subscription.updated",
            BillingEvent::SubscriptionDeleted(_) => "customer.subscription.deleted",
            BillingEvent::Unrecognized { event_type } => event_type,
        }
    }

    /// External billing-customer identifier, when the payload carries one.
    pub fn billing_customer_id(&self) -> Option<&str> {
        match self {
            BillingEvent::CheckoutCompleted(s) => s.customer.as_deref(),
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                Some(&sub.customer)
            }
            BillingEvent::Unrecognized { .. } => None,
        }
    }

    pub fn external_subscription_id(&self) -> Option<&str> {
        match self {
            BillingEvent::CheckoutCompleted(s) => s.subscription.as_deref(),
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                Some(&sub.id)
            }
            BillingEvent::Unrecognized { .. } => None,
        }
    }

    /// Metadata binding the billing customer to a local user identifier:
    /// `client_reference_id` on checkout sessions, `metadata.user_id`
    /// otherwise.
    pub fn local_user_ref(&self) -> Option<&str> {
        match self {
            BillingEvent::CheckoutCompleted(s) => s
                .client_reference_id
                .as_deref()
                .or_else(|| s.metadata.get("user_id").map(String::as_str)),
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                sub.metadata.get("user_id").map(String::as_str)
            }
            BillingEvent::Unrecognized { .. } => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            BillingEvent::CheckoutCompleted(s) => s
                .customer_email
                .as_deref()
                .or_else(|| s.customer_details.as_ref().and_then(|d| d.email.as_deref())),
            _ => None,
        }
    }

    pub fn price_id(&self) -> Option<&str> {
        match self {
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => sub
                .items
                .as_ref()
                .and_then(|items| items.data.first())
                .map(|item| item.price.id.as_str()),
            _ => None,
        }
    }

    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        match self {
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                sub.current_period_start.and_then(timestamp_to_utc)
            }
            _ => None,
        }
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        match self {
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                sub.current_period_end.and_then(timestamp_to_utc)
            }
            _ => None,
        }
    }
}

fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
