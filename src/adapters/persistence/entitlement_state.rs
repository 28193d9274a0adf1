use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing_sync::EntitlementStateRepo,
    domain::entities::entitlement::{EntitlementState, EntitlementStatus},
};

fn row_to_state(row: sqlx::postgres::PgRow) -> EntitlementState {
    EntitlementState {
        user_id: row.get("user_id"),
        status: row.get("status"),
        billing_customer_id: row.get("billing_customer_id"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "user_id, status, billing_customer_id, updated_at";

#[async_trait]
impl EntitlementStateRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementState>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM entitlement_states WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_state))
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        status: EntitlementStatus,
        billing_customer_id: &str,
    ) -> AppResult<EntitlementState> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO entitlement_states (user_id, status, billing_customer_id, updated_at)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
            ON CONFLICT (user_id) DO UPDATE SET
                status = EXCLUDED.status,
                billing_customer_id = EXCLUDED.billing_customer_id,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(status)
        .bind(billing_customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_state(row))
    }
}
