use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One-to-one binding between a local user and the payment provider's
/// customer identifier. Created lazily on the first event for an unseen
/// customer and never deleted by this subsystem.
#[derive(Debug, Clone)]
pub struct BillingCustomer {
    pub user_id: Uuid,
    pub billing_customer_id: String,
    pub created_at: Option<DateTime<Utc>>,
}
