use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::study_plan::{CreateSubjectInput, SubjectRepo, UpdateSubjectInput},
    domain::entities::subject::Subject,
};

fn row_to_subject(row: sqlx::postgres::PgRow) -> Subject {
    Subject {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        color: row.get("color"),
        exam_date: row.get("exam_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, user_id, name, color, exam_date, created_at, updated_at";

#[async_trait]
impl SubjectRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subject>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subjects WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_subject))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subject>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subjects WHERE user_id = $1 ORDER BY created_at",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_subject).collect())
    }

    async fn create(&self, user_id: Uuid, input: &CreateSubjectInput) -> AppResult<Subject> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subjects (id, user_id, name, color, exam_date)
            VALUES ($1, $2, $3, COALESCE($4, '#4f46e5'), $5)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.color)
        .bind(input.exam_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subject(row))
    }

    async fn update(&self, id: Uuid, input: &UpdateSubjectInput) -> AppResult<Subject> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subjects SET
                name = COALESCE($2, name),
                color = COALESCE($3, color),
                exam_date = COALESCE($4, exam_date),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.color)
        .bind(input.exam_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subject(row))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
