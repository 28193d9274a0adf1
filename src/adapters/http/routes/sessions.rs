//! Study-session routes.

use super::common::*;
use crate::application::use_cases::study_plan::LogSessionInput;

/// GET /api/sessions
async fn list_sessions(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let sessions = app_state.study_plan.list_sessions(user_id).await?;
    Ok(Json(sessions))
}

/// POST /api/sessions
async fn log_session(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(input): Json<LogSessionInput>,
) -> AppResult<impl IntoResponse> {
    let session = app_state.study_plan.log_session(user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(app_state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    app_state
        .study_plan
        .delete_session(user_id, session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(log_session))
        .route("/sessions/{id}", delete(delete_session))
}
