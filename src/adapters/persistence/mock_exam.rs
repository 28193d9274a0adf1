use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::study_plan::{MockExamRepo, RecordMockExamInput},
    domain::entities::mock_exam::MockExam,
};

fn row_to_exam(row: sqlx::postgres::PgRow) -> MockExam {
    MockExam {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subject_id: row.get("subject_id"),
        taken_on: row.get("taken_on"),
        score: row.get("score"),
        max_score: row.get("max_score"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, user_id, subject_id, taken_on, score, max_score, created_at";

#[async_trait]
impl MockExamRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<MockExam>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM mock_exams WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_exam))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<MockExam>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM mock_exams WHERE user_id = $1 ORDER BY taken_on DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_exam).collect())
    }

    async fn create(&self, user_id: Uuid, input: &RecordMockExamInput) -> AppResult<MockExam> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO mock_exams (id, user_id, subject_id, taken_on, score, max_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.subject_id)
        .bind(input.taken_on)
        .bind(input.score)
        .bind(input.max_score)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_exam(row))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM mock_exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
