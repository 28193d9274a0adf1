//! Subscription reconciliation: maps verified billing events onto the local
//! entitlement store and answers entitlement reads for the access gate.
//!
//! The payment provider is the source of truth for billing; the local
//! `entitlement_states` row is a deliberately lossy projection of it that
//! every protected request consults. Events arrive asynchronously, possibly
//! out of order and more than once; they are applied in arrival order with
//! no provider-side-clock gating.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        billing_customer::BillingCustomer,
        billing_event::BillingEvent,
        entitlement::{EntitlementEvent, EntitlementState, EntitlementStatus, NewEntitlementEvent},
        user::UserProfile,
    },
};

// ============================================================================
// Summary Type
// ============================================================================

/// Composition of the current-state record and the latest history row,
/// consumed by the access gate and the account page.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementSummary {
    pub status: EntitlementStatus,
    pub billing_customer_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_active: bool,
}

// ============================================================================
// Repository Traits
// ============================================================================

/// Identity directory. Account issuance belongs to authentication; this
/// subsystem only looks users up and provisions shadow accounts.
#[async_trait]
pub trait UserDirectoryRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;
    async fn create_shadow(&self, email: Option<&str>) -> AppResult<UserProfile>;
}

#[async_trait]
pub trait BillingCustomerRepo: Send + Sync {
    async fn get_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> AppResult<Option<BillingCustomer>>;
    /// Idempotent: binding an already-bound customer keeps the existing row.
    async fn bind(&self, user_id: Uuid, billing_customer_id: &str) -> AppResult<BillingCustomer>;
}

#[async_trait]
pub trait EntitlementStateRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementState>>;
    /// Whole-row upsert keyed on `user_id`; the last write to commit wins.
    async fn upsert(
        &self,
        user_id: Uuid,
        status: EntitlementStatus,
        billing_customer_id: &str,
    ) -> AppResult<EntitlementState>;
}

#[async_trait]
pub trait EntitlementEventRepo: Send + Sync {
    async fn append(&self, input: &NewEntitlementEvent) -> AppResult<()>;
    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementEvent>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<EntitlementEvent>>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingSyncUseCases {
    directory_repo: Arc<dyn UserDirectoryRepo>,
    customer_repo: Arc<dyn BillingCustomerRepo>,
    state_repo: Arc<dyn EntitlementStateRepo>,
    event_repo: Arc<dyn EntitlementEventRepo>,
}

impl BillingSyncUseCases {
    pub fn new(
        directory_repo: Arc<dyn UserDirectoryRepo>,
        customer_repo: Arc<dyn BillingCustomerRepo>,
        state_repo: Arc<dyn EntitlementStateRepo>,
        event_repo: Arc<dyn EntitlementEventRepo>,
    ) -> Self {
        Self {
            directory_repo,
            customer_repo,
            state_repo,
            event_repo,
        }
    }

    // ========================================================================
    // Identity Resolution
    // ========================================================================

    /// Resolve a billing-customer identifier to a local user, provisioning a
    /// shadow account when nothing else matches.
    ///
    /// Resolution order: existing binding, metadata user reference, email
    /// lookup, shadow provisioning. Once a binding exists, repeat calls with
    /// the same customer id short-circuit on it.
    pub async fn resolve_user(
        &self,
        billing_customer_id: &str,
        local_user_ref: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Uuid> {
        if let Some(existing) = self
            .customer_repo
            .get_by_billing_customer_id(billing_customer_id)
            .await?
        {
            return Ok(existing.user_id);
        }

        if let Some(raw) = local_user_ref
            && let Ok(user_id) = Uuid::parse_str(raw)
            && self.directory_repo.get_by_id(user_id).await?.is_some()
        {
            self.customer_repo
                .bind(user_id, billing_customer_id)
                .await?;
            return Ok(user_id);
        }

        if let Some(email) = email
            && let Some(user) = self.directory_repo.get_by_email(email).await?
        {
            self.customer_repo.bind(user.id, billing_customer_id).await?;
            return Ok(user.id);
        }

        let shadow = self.directory_repo.create_shadow(email).await.map_err(|e| {
            AppError::Unprocessable(format!(
                "cannot resolve billing customer {}: shadow user provisioning failed: {}",
                billing_customer_id, e
            ))
        })?;
        self.customer_repo
            .bind(shadow.id, billing_customer_id)
            .await?;

        tracing::info!(
            user_id = %shadow.id,
            billing_customer_id,
            has_email = email.is_some(),
            "Provisioned shadow user for unmatched billing customer"
        );
        Ok(shadow.id)
    }

    // ========================================================================
    // Event Application
    // ========================================================================

    /// Apply a verified billing event: resolve the user, run the status
    /// transition, upsert the current-state row and append a history row.
    ///
    /// The upsert is authoritative - its failure fails the whole event so the
    /// provider redelivers. The history append is best-effort: a failure
    /// after a successful upsert is logged and swallowed.
    pub async fn apply_event(&self, event: &BillingEvent) -> AppResult<()> {
        let Some(status) = EntitlementStatus::from_event(event) else {
            tracing::debug!(
                event_type = event.event_type(),
                "Ignoring unrecognized billing event"
            );
            return Ok(());
        };

        let (Some(customer_id), Some(subscription_id)) =
            (event.billing_customer_id(), event.external_subscription_id())
        else {
            // One-time payments and incomplete checkout payloads carry no
            // subscription; nothing to reconcile.
            tracing::debug!(
                event_type = event.event_type(),
                "Billing event without customer/subscription, skipping"
            );
            return Ok(());
        };

        let user_id = self
            .resolve_user(customer_id, event.local_user_ref(), event.email())
            .await?;

        let state = self.state_repo.upsert(user_id, status, customer_id).await?;
        tracing::info!(
            user_id = %user_id,
            event_type = event.event_type(),
            status = %state.status,
            "Entitlement state updated"
        );

        let record = NewEntitlementEvent {
            user_id,
            external_subscription_id: subscription_id.to_string(),
            price_id: event.price_id().map(str::to_string),
            status,
            period_start: event.period_start(),
            period_end: event.period_end(),
        };
        if let Err(e) = self.event_repo.append(&record).await {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                event_type = event.event_type(),
                "Failed to append entitlement history (non-critical)"
            );
        }

        Ok(())
    }

    // ========================================================================
    // Reconciliation Reads
    // ========================================================================

    /// Current entitlement for a user: current-state row plus the period
    /// fields of the most recent history row. A missing row is a valid empty
    /// state (`inactive`), never an error; only lookup failures propagate.
    pub async fn get_entitlement(&self, user_id: Uuid) -> AppResult<EntitlementSummary> {
        let state = self.state_repo.get_by_user(user_id).await?;
        let latest = self.event_repo.latest_by_user(user_id).await?;

        let status = state
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(EntitlementStatus::Inactive);

        Ok(EntitlementSummary {
            status,
            billing_customer_id: state.map(|s| s.billing_customer_id),
            current_period_start: latest.as_ref().and_then(|e| e.period_start),
            current_period_end: latest.as_ref().and_then(|e| e.period_end),
            is_active: status.is_active(),
        })
    }

    /// Full history ledger for a user, newest first. Reporting only.
    pub async fn get_history(&self, user_id: Uuid) -> AppResult<Vec<EntitlementEvent>> {
        self.event_repo.list_by_user(user_id).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        self.directory_repo.get_by_id(user_id).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        InMemoryBillingCustomerRepo, InMemoryEntitlementEventRepo, InMemoryEntitlementStateRepo,
        InMemoryUserDirectoryRepo, checkout_completed_event, create_test_user,
        subscription_event_with,
    };

    struct Repos {
        directory: Arc<InMemoryUserDirectoryRepo>,
        customers: Arc<InMemoryBillingCustomerRepo>,
        states: Arc<InMemoryEntitlementStateRepo>,
        events: Arc<InMemoryEntitlementEventRepo>,
    }

    fn use_cases() -> (BillingSyncUseCases, Repos) {
        let directory = Arc::new(InMemoryUserDirectoryRepo::new());
        let customers = Arc::new(InMemoryBillingCustomerRepo::new());
        let states = Arc::new(InMemoryEntitlementStateRepo::new());
        let events = Arc::new(InMemoryEntitlementEventRepo::new());
        let use_cases = BillingSyncUseCases::new(
            directory.clone(),
            customers.clone(),
            states.clone(),
            events.clone(),
        );
        (
            use_cases,
            Repos {
                directory,
                customers,
                states,
                events,
            },
        )
    }

    // ------------------------------------------------------------------
    // resolve_user
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn resolution_is_idempotent_for_known_customers() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());

        let first = use_cases
            .resolve_user("cus_1", Some(&user.id.to_string()), None)
            .await
            .unwrap();
        // Second call carries no hints at all; the binding alone resolves it.
        let second = use_cases.resolve_user("cus_1", None, None).await.unwrap();

        assert_eq!(first, user.id);
        assert_eq!(second, user.id);
        assert_eq!(repos.customers.binding_count(), 1);
    }

    #[tokio::test]
    async fn metadata_reference_binds_known_user() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());

        let resolved = use_cases
            .resolve_user("cus_meta", Some(&user.id.to_string()), Some("other@example.com"))
            .await
            .unwrap();

        assert_eq!(resolved, user.id);
        // Metadata wins before the email path runs; no new users created.
        assert_eq!(repos.directory.user_count(), 1);
    }

    #[tokio::test]
    async fn email_lookup_binds_existing_user() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|u| u.email = Some("ada@example.com".to_string()));
        repos.directory.insert(user.clone());

        let resolved = use_cases
            .resolve_user("cus_email", None, Some("ada@example.com"))
            .await
            .unwrap();

        assert_eq!(resolved, user.id);
        assert_eq!(repos.directory.user_count(), 1);
    }

    #[tokio::test]
    async fn unknown_customer_provisions_shadow_user() {
        let (use_cases, repos) = use_cases();

        let resolved = use_cases
            .resolve_user("cus_new", None, Some("new@example.com"))
            .await
            .unwrap();

        let shadow = repos.directory.get(resolved).unwrap();
        assert!(shadow.is_shadow);
        assert_eq!(shadow.email.as_deref(), Some("new@example.com"));
        assert_eq!(repos.customers.binding_count(), 1);
    }

    #[tokio::test]
    async fn stale_metadata_falls_through_to_shadow_provisioning() {
        let (use_cases, repos) = use_cases();

        // Reference to a user id the directory does not know.
        let resolved = use_cases
            .resolve_user("cus_x", Some(&Uuid::new_v4().to_string()), None)
            .await
            .unwrap();

        assert!(repos.directory.get(resolved).unwrap().is_shadow);
    }

    #[tokio::test]
    async fn provisioning_failure_is_unprocessable() {
        let (use_cases, repos) = use_cases();
        repos.directory.fail_creates(true);

        let err = use_cases
            .resolve_user("cus_fail", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unprocessable(_)));
        assert_eq!(repos.customers.binding_count(), 0);
    }

    // ------------------------------------------------------------------
    // apply_event
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn past_due_update_transitions_active_user_and_appends_history() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());

        use_cases
            .apply_event(&checkout_completed_event("cus_1", "sub_1", &user.id.to_string()))
            .await
            .unwrap();
        use_cases
            .apply_event(&subscription_event_with("updated", "cus_1", "sub_1", "past_due"))
            .await
            .unwrap();

        let state = repos.states.get(user.id).unwrap();
        assert_eq!(state.status, EntitlementStatus::PastDue);

        let history = repos.events.all_for(user.id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, EntitlementStatus::Active);
        assert_eq!(history[1].status, EntitlementStatus::PastDue);
    }

    #[tokio::test]
    async fn checkout_for_unseen_customer_creates_shadow_and_activates() {
        let (use_cases, repos) = use_cases();

        let event = checkout_completed_event("cus_fresh", "sub_fresh", "not-a-uuid");
        use_cases.apply_event(&event).await.unwrap();

        let binding = repos.customers.get("cus_fresh").unwrap();
        let shadow = repos.directory.get(binding.user_id).unwrap();
        assert!(shadow.is_shadow);

        let state = repos.states.get(binding.user_id).unwrap();
        assert_eq!(state.status, EntitlementStatus::Active);
        assert_eq!(state.billing_customer_id, "cus_fresh");
    }

    #[tokio::test]
    async fn arrival_order_wins_over_provider_chronology() {
        // Event B (canceled, chronologically newer) arrives first; event A
        // (active, chronologically older) arrives second. Arrival order is
        // the policy, so the final state is active even though it is stale.
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());
        use_cases
            .apply_event(&checkout_completed_event("cus_1", "sub_1", &user.id.to_string()))
            .await
            .unwrap();

        use_cases
            .apply_event(&subscription_event_with("deleted", "cus_1", "sub_1", "canceled"))
            .await
            .unwrap();
        use_cases
            .apply_event(&subscription_event_with("updated", "cus_1", "sub_1", "active"))
            .await
            .unwrap();

        assert_eq!(
            repos.states.get(user.id).unwrap().status,
            EntitlementStatus::Active
        );
    }

    #[tokio::test]
    async fn duplicate_deliveries_append_duplicate_history_rows() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());

        let event = checkout_completed_event("cus_1", "sub_1", &user.id.to_string());
        use_cases.apply_event(&event).await.unwrap();
        use_cases.apply_event(&event).await.unwrap();

        // At-least-once delivery: the ledger is not deduplicated.
        assert_eq!(repos.events.all_for(user.id).len(), 2);
        assert_eq!(repos.customers.binding_count(), 1);
    }

    #[tokio::test]
    async fn history_append_failure_is_swallowed_after_upsert() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());
        repos.events.fail_appends(true);

        let event = checkout_completed_event("cus_1", "sub_1", &user.id.to_string());
        let result = use_cases.apply_event(&event).await;

        // Current state is authoritative; the lost history row is accepted.
        assert!(result.is_ok());
        assert_eq!(
            repos.states.get(user.id).unwrap().status,
            EntitlementStatus::Active
        );
        assert!(repos.events.all_for(user.id).is_empty());
    }

    #[tokio::test]
    async fn state_upsert_failure_fails_the_event() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());
        repos.states.fail_writes(true);

        let event = checkout_completed_event("cus_1", "sub_1", &user.id.to_string());
        assert!(use_cases.apply_event(&event).await.is_err());
        assert!(repos.events.all_for(user.id).is_empty());
    }

    #[tokio::test]
    async fn unrecognized_events_are_accepted_without_writes() {
        let (use_cases, repos) = use_cases();

        let event = BillingEvent::Unrecognized {
            event_type: "invoice.paid".to_string(),
        };
        use_cases.apply_event(&event).await.unwrap();

        assert_eq!(repos.customers.binding_count(), 0);
        assert_eq!(repos.directory.user_count(), 0);
    }

    #[tokio::test]
    async fn checkout_without_subscription_is_skipped() {
        let (use_cases, repos) = use_cases();

        let raw = serde_json::json!({
            "type": "checkout.session.completed",
            "data": {"object": {"customer": "cus_1"}}
        })
        .to_string();
        let event = BillingEvent::parse(&raw).unwrap();

        use_cases.apply_event(&event).await.unwrap();
        assert_eq!(repos.customers.binding_count(), 0);
    }

    // ------------------------------------------------------------------
    // get_entitlement
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn missing_state_reads_as_inactive_not_error() {
        let (use_cases, _repos) = use_cases();

        let summary = use_cases.get_entitlement(Uuid::new_v4()).await.unwrap();

        assert_eq!(summary.status, EntitlementStatus::Inactive);
        assert!(!summary.is_active);
        assert!(summary.billing_customer_id.is_none());
        assert!(summary.current_period_start.is_none());
        assert!(summary.current_period_end.is_none());
    }

    #[tokio::test]
    async fn period_fields_come_verbatim_from_latest_history_row() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());

        let period_end: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
        let event = subscription_event_with("updated", "cus_1", "sub_1", "active");
        let mut raw = match event {
            BillingEvent::SubscriptionUpdated(p) => p,
            _ => unreachable!(),
        };
        raw.metadata
            .insert("user_id".to_string(), user.id.to_string());
        raw.current_period_end = Some(period_end.timestamp());
        use_cases
            .apply_event(&BillingEvent::SubscriptionUpdated(raw))
            .await
            .unwrap();

        let summary = use_cases.get_entitlement(user.id).await.unwrap();
        assert_eq!(summary.status, EntitlementStatus::Active);
        assert!(summary.is_active);
        assert_eq!(summary.current_period_end, Some(period_end));
    }

    #[tokio::test]
    async fn store_read_failure_surfaces_as_error() {
        let (use_cases, repos) = use_cases();
        repos.states.fail_reads(true);

        assert!(use_cases.get_entitlement(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn history_lists_newest_first() {
        let (use_cases, repos) = use_cases();
        let user = create_test_user(|_| {});
        repos.directory.insert(user.clone());
        use_cases
            .apply_event(&checkout_completed_event("cus_1", "sub_1", &user.id.to_string()))
            .await
            .unwrap();
        use_cases
            .apply_event(&subscription_event_with("updated", "cus_1", "sub_1", "past_due"))
            .await
            .unwrap();

        let history = use_cases.get_history(user.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, EntitlementStatus::PastDue);
        assert!(history[0].received_at >= history[1].received_at);
    }
}
