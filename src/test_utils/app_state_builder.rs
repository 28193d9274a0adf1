//! Test app state builder for HTTP-level integration testing.
//!
//! Provides `TestAppStateBuilder`, which creates a minimal `AppState` backed
//! by in-memory mocks. `build_with_repos` also hands back the repos so tests
//! can inspect writes and flip failure toggles.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{billing_sync::BillingSyncUseCases, study_plan::StudyPlanUseCases},
    domain::entities::{
        entitlement::{EntitlementEvent, EntitlementState},
        subject::Subject,
        user::UserProfile,
    },
    infra::config::AppConfig,
    test_utils::{
        InMemoryBillingCustomerRepo, InMemoryEntitlementEventRepo, InMemoryEntitlementStateRepo,
        InMemoryMockExamRepo, InMemoryStudySessionRepo, InMemorySubjectRepo,
        InMemoryUserDirectoryRepo,
    },
};

/// Handles to the in-memory billing repos behind a built `AppState`.
pub struct TestRepos {
    pub directory: Arc<InMemoryUserDirectoryRepo>,
    pub customers: Arc<InMemoryBillingCustomerRepo>,
    pub states: Arc<InMemoryEntitlementStateRepo>,
    pub events: Arc<InMemoryEntitlementEventRepo>,
    pub subjects: Arc<InMemorySubjectRepo>,
}

pub struct TestAppStateBuilder {
    users: Vec<UserProfile>,
    states: Vec<EntitlementState>,
    events: Vec<EntitlementEvent>,
    subjects: Vec<Subject>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            states: vec![],
            events: vec![],
            subjects: vec![],
        }
    }

    /// Add a user to the identity directory.
    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    /// Seed an entitlement current-state row.
    pub fn with_state(mut self, state: EntitlementState) -> Self {
        self.states.push(state);
        self
    }

    /// Seed an entitlement history row.
    pub fn with_event(mut self, event: EntitlementEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Seed a subject.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_repos().0
    }

    pub fn build_with_repos(self) -> (AppState, TestRepos) {
        let directory = Arc::new(InMemoryUserDirectoryRepo::with_users(self.users));
        let customers = Arc::new(InMemoryBillingCustomerRepo::new());
        let states = Arc::new(InMemoryEntitlementStateRepo::with_states(self.states));
        let events = Arc::new(InMemoryEntitlementEventRepo::with_events(self.events));

        let subjects = Arc::new(InMemorySubjectRepo::new());
        for subject in self.subjects {
            subjects.insert(subject);
        }

        let billing_sync = BillingSyncUseCases::new(
            directory.clone(),
            customers.clone(),
            states.clone(),
            events.clone(),
        );

        let study_plan = StudyPlanUseCases::new(
            subjects.clone(),
            Arc::new(InMemoryStudySessionRepo::new()),
            Arc::new(InMemoryMockExamRepo::new()),
        );

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new("test_jwt_secret".into()),
            stripe_secret_key: SecretString::new("sk_test_xxx".into()),
            stripe_webhook_secret: SecretString::new("whsec_test_secret".into()),
            stripe_price_id: "price_test123".to_string(),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            service_database_url: String::new(),
        });

        let app_state = AppState {
            config,
            billing_sync: Arc::new(billing_sync),
            study_plan: Arc::new(study_plan),
        };

        (
            app_state,
            TestRepos {
                directory,
                customers,
                states,
                events,
                subjects,
            },
        )
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
