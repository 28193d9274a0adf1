use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct MockExam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub taken_on: NaiveDate,
    pub score: i32,
    pub max_score: i32,
    pub created_at: Option<DateTime<Utc>>,
}
