use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing_sync::UserDirectoryRepo,
    domain::entities::user::UserProfile,
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        is_shadow: row.get("is_shadow"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, email, is_shadow, created_at, updated_at";

#[async_trait]
impl UserDirectoryRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = $1",
            SELECT_COLS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn create_shadow(&self, email: Option<&str>) -> AppResult<UserProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, is_shadow)
            VALUES ($1, $2, true)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(email.map(str::to_lowercase))
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }
}
