use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{billing_sync::BillingSyncUseCases, study_plan::StudyPlanUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_sync: Arc<BillingSyncUseCases>,
    pub study_plan: Arc<StudyPlanUseCases>,
}
