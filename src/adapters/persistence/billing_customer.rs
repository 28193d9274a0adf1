use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing_sync::BillingCustomerRepo,
    domain::entities::billing_customer::BillingCustomer,
};

fn row_to_customer(row: sqlx::postgres::PgRow) -> BillingCustomer {
    BillingCustomer {
        user_id: row.get("user_id"),
        billing_customer_id: row.get("billing_customer_id"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "user_id, billing_customer_id, created_at";

#[async_trait]
impl BillingCustomerRepo for PostgresPersistence {
    async fn get_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> AppResult<Option<BillingCustomer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM billing_customers WHERE billing_customer_id = $1",
            SELECT_COLS
        ))
        .bind(billing_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_customer))
    }

    async fn bind(&self, user_id: Uuid, billing_customer_id: &str) -> AppResult<BillingCustomer> {
        // Concurrent deliveries may race to bind the same customer; the first
        // insert wins and later calls get the existing row back.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO billing_customers (user_id, billing_customer_id)
            VALUES ($1, $2)
            ON CONFLICT (billing_customer_id) DO UPDATE SET
                user_id = billing_customers.user_id
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(billing_customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_customer(row))
    }
}
