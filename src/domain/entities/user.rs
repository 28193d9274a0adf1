use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Local identity. Authentication owns account issuance; this subsystem only
/// reads the directory and lazily provisions shadow accounts for billing
/// customers that cannot be matched to an existing user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    /// Shadow accounts provisioned from billing events may have no email.
    pub email: Option<String>,
    pub is_shadow: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
