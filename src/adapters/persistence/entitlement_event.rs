use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing_sync::EntitlementEventRepo,
    domain::entities::entitlement::{EntitlementEvent, NewEntitlementEvent},
};

fn row_to_event(row: sqlx::postgres::PgRow) -> EntitlementEvent {
    EntitlementEvent {
        id: row.get("id"),
        user_id: row.get("user_id"),
        external_subscription_id: row.get("external_subscription_id"),
        price_id: row.get("price_id"),
        status: row.get("status"),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        received_at: row.get("received_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, external_subscription_id, price_id, status,
    period_start, period_end, received_at
"#;

#[async_trait]
impl EntitlementEventRepo for PostgresPersistence {
    async fn append(&self, input: &NewEntitlementEvent) -> AppResult<()> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO entitlement_events
                (id, user_id, external_subscription_id, price_id, status, period_start, period_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(input.user_id)
        .bind(&input.external_subscription_id)
        .bind(&input.price_id)
        .bind(input.status)
        .bind(input.period_start)
        .bind(input.period_end)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementEvent>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM entitlement_events WHERE user_id = $1 ORDER BY received_at DESC LIMIT 1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_event))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<EntitlementEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entitlement_events WHERE user_id = $1 ORDER BY received_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_event).collect())
    }
}
