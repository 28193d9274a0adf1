pub mod billing;
pub mod billing_webhooks;
pub mod common;
pub mod mock_exams;
pub mod sessions;
pub mod subjects;

use axum::{Router, middleware};

use crate::adapters::http::{
    app_state::AppState,
    middleware::{entitlement_gate, require_auth},
};

pub fn router(app_state: AppState) -> Router<AppState> {
    // Study data requires a confirmed active entitlement; billing routes only
    // need an authenticated session (a user must be able to check their own
    // subscription and reach checkout while not entitled).
    let gated = Router::new()
        .merge(subjects::router())
        .merge(sessions::router())
        .merge(mock_exams::router())
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            entitlement_gate,
        ));

    let authed = Router::new()
        .merge(gated)
        .merge(billing::router())
        .layer(middleware::from_fn_with_state(app_state, require_auth));

    // The webhook authenticates via its signature, not a session.
    Router::new().merge(authed).merge(billing_webhooks::router())
}
