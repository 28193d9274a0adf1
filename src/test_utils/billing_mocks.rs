//! In-memory mock implementations for the billing repository traits.
//!
//! Each mock keeps its rows behind a `Mutex` and exposes inspection helpers
//! plus failure toggles so tests can exercise the store-failure paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::billing_sync::{
        BillingCustomerRepo, EntitlementEventRepo, EntitlementStateRepo, UserDirectoryRepo,
    },
    domain::entities::{
        billing_customer::BillingCustomer,
        entitlement::{EntitlementEvent, EntitlementState, EntitlementStatus, NewEntitlementEvent},
        user::UserProfile,
    },
};

// ============================================================================
// InMemoryUserDirectoryRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserDirectoryRepo {
    pub users: Mutex<HashMap<Uuid, UserProfile>>,
    fail_creates: Mutex<bool>,
}

impl InMemoryUserDirectoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let map: HashMap<Uuid, UserProfile> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
            fail_creates: Mutex::new(false),
        }
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<UserProfile> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn fail_creates(&self, fail: bool) {
        *self.fail_creates.lock().unwrap() = fail;
    }
}

#[async_trait]
impl UserDirectoryRepo for InMemoryUserDirectoryRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.as_deref() == Some(email.as_str()))
            .cloned())
    }

    async fn create_shadow(&self, email: Option<&str>) -> AppResult<UserProfile> {
        if *self.fail_creates.lock().unwrap() {
            return Err(AppError::Database("directory unavailable".into()));
        }
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: email.map(str::to_lowercase),
            is_shadow: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }
}

// ============================================================================
// InMemoryBillingCustomerRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillingCustomerRepo {
    pub bindings: Mutex<HashMap<String, BillingCustomer>>,
}

impl InMemoryBillingCustomerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, billing_customer_id: &str) -> Option<BillingCustomer> {
        self.bindings
            .lock()
            .unwrap()
            .get(billing_customer_id)
            .cloned()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.lock().unwrap().len()
    }
}

#[async_trait]
impl BillingCustomerRepo for InMemoryBillingCustomerRepo {
    async fn get_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> AppResult<Option<BillingCustomer>> {
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .get(billing_customer_id)
            .cloned())
    }

    async fn bind(&self, user_id: Uuid, billing_customer_id: &str) -> AppResult<BillingCustomer> {
        let mut bindings = self.bindings.lock().unwrap();
        // First binding wins, like the ON CONFLICT clause in postgres.
        let customer = bindings
            .entry(billing_customer_id.to_string())
            .or_insert_with(|| BillingCustomer {
                user_id,
                billing_customer_id: billing_customer_id.to_string(),
                created_at: Some(Utc::now()),
            });
        Ok(customer.clone())
    }
}

// ============================================================================
// InMemoryEntitlementStateRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryEntitlementStateRepo {
    pub states: Mutex<HashMap<Uuid, EntitlementState>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl InMemoryEntitlementStateRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(states: Vec<EntitlementState>) -> Self {
        let map: HashMap<Uuid, EntitlementState> =
            states.into_iter().map(|s| (s.user_id, s)).collect();
        Self {
            states: Mutex::new(map),
            fail_reads: Mutex::new(false),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<EntitlementState> {
        self.states.lock().unwrap().get(&user_id).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

#[async_trait]
impl EntitlementStateRepo for InMemoryEntitlementStateRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementState>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(AppError::Database("state store unavailable".into()));
        }
        Ok(self.states.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        status: EntitlementStatus,
        billing_customer_id: &str,
    ) -> AppResult<EntitlementState> {
        if *self.fail_writes.lock().unwrap() {
            return Err(AppError::Database("state store unavailable".into()));
        }
        let state = EntitlementState {
            user_id,
            status,
            billing_customer_id: billing_customer_id.to_string(),
            updated_at: Some(Utc::now()),
        };
        self.states.lock().unwrap().insert(user_id, state.clone());
        Ok(state)
    }
}

// ============================================================================
// InMemoryEntitlementEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryEntitlementEventRepo {
    pub events: Mutex<Vec<EntitlementEvent>>,
    fail_appends: Mutex<bool>,
}

impl InMemoryEntitlementEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<EntitlementEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            fail_appends: Mutex::new(false),
        }
    }

    pub fn all_for(&self, user_id: Uuid) -> Vec<EntitlementEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn fail_appends(&self, fail: bool) {
        *self.fail_appends.lock().unwrap() = fail;
    }

    fn sorted_desc(&self, user_id: Uuid) -> Vec<EntitlementEvent> {
        let mut events = self.all_for(user_id);
        events.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        events
    }
}

#[async_trait]
impl EntitlementEventRepo for InMemoryEntitlementEventRepo {
    async fn append(&self, input: &NewEntitlementEvent) -> AppResult<()> {
        if *self.fail_appends.lock().unwrap() {
            return Err(AppError::Database("ledger unavailable".into()));
        }
        let mut events = self.events.lock().unwrap();
        // Monotonic receive times so ordering assertions are stable even
        // when two appends land within clock resolution.
        let received_at = {
            let now = Utc::now();
            match events.last().and_then(|e| e.received_at) {
                Some(prev) if prev >= now => prev + chrono::Duration::microseconds(1),
                _ => now,
            }
        };
        events.push(EntitlementEvent {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            external_subscription_id: input.external_subscription_id.clone(),
            price_id: input.price_id.clone(),
            status: input.status,
            period_start: input.period_start,
            period_end: input.period_end,
            received_at: Some(received_at),
        });
        Ok(())
    }

    async fn latest_by_user(&self, user_id: Uuid) -> AppResult<Option<EntitlementEvent>> {
        Ok(self.sorted_desc(user_id).into_iter().next())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<EntitlementEvent>> {
        Ok(self.sorted_desc(user_id))
    }
}
