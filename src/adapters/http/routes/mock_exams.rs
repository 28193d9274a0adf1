//! Mock-exam tracking routes.

use super::common::*;
use crate::application::use_cases::study_plan::RecordMockExamInput;

/// GET /api/mock-exams
async fn list_mock_exams(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let exams = app_state.study_plan.list_mock_exams(user_id).await?;
    Ok(Json(exams))
}

/// POST /api/mock-exams
async fn record_mock_exam(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(input): Json<RecordMockExamInput>,
) -> AppResult<impl IntoResponse> {
    let exam = app_state
        .study_plan
        .record_mock_exam(user_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

/// DELETE /api/mock-exams/{id}
async fn delete_mock_exam(
    State(app_state): State<AppState>,
    Path(exam_id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    app_state
        .study_plan
        .delete_mock_exam(user_id, exam_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/mock-exams", get(list_mock_exams).post(record_mock_exam))
        .route("/mock-exams/{id}", delete(delete_mock_exam))
}
