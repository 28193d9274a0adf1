use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::study_plan::{LogSessionInput, StudySessionRepo},
    domain::entities::study_session::StudySession,
};

fn row_to_session(row: sqlx::postgres::PgRow) -> StudySession {
    StudySession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subject_id: row.get("subject_id"),
        started_at: row.get("started_at"),
        duration_minutes: row.get("duration_minutes"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str =
    "id, user_id, subject_id, started_at, duration_minutes, notes, created_at";

#[async_trait]
impl StudySessionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<StudySession>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM study_sessions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_session))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<StudySession>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM study_sessions WHERE user_id = $1 ORDER BY started_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_session).collect())
    }

    async fn create(&self, user_id: Uuid, input: &LogSessionInput) -> AppResult<StudySession> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO study_sessions (id, user_id, subject_id, started_at, duration_minutes, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.subject_id)
        .bind(input.started_at)
        .bind(input.duration_minutes)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_session(row))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM study_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
