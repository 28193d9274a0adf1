use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    infra::{config::AppConfig, postgres_persistence},
    use_cases::{
        billing_sync::{
            BillingCustomerRepo, BillingSyncUseCases, EntitlementEventRepo, EntitlementStateRepo,
            UserDirectoryRepo,
        },
        study_plan::{MockExamRepo, StudyPlanUseCases, StudySessionRepo, SubjectRepo},
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    // Restricted tier: user-scoped study data.
    let app_pg = Arc::new(postgres_persistence(&config.database_url).await?);

    // Elevated tier: the identity resolver and entitlement store act across
    // users, so they bypass the row-level restrictions of the app tier.
    let service_pg = if config.service_database_url == config.database_url {
        app_pg.clone()
    } else {
        Arc::new(postgres_persistence(&config.service_database_url).await?)
    };

    let billing_sync = BillingSyncUseCases::new(
        service_pg.clone() as Arc<dyn UserDirectoryRepo>,
        service_pg.clone() as Arc<dyn BillingCustomerRepo>,
        service_pg.clone() as Arc<dyn EntitlementStateRepo>,
        service_pg as Arc<dyn EntitlementEventRepo>,
    );

    let study_plan = StudyPlanUseCases::new(
        app_pg.clone() as Arc<dyn SubjectRepo>,
        app_pg.clone() as Arc<dyn StudySessionRepo>,
        app_pg as Arc<dyn MockExamRepo>,
    );

    Ok(AppState {
        config: Arc::new(config),
        billing_sync: Arc::new(billing_sync),
        study_plan: Arc::new(study_plan),
    })
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "prepdeck=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
