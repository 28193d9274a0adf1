use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
