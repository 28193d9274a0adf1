//! Subject CRUD routes. All routes sit behind the auth and entitlement
//! middleware.

use super::common::*;
use crate::application::use_cases::study_plan::{CreateSubjectInput, UpdateSubjectInput};

/// GET /api/subjects
async fn list_subjects(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let subjects = app_state.study_plan.list_subjects(user_id).await?;
    Ok(Json(subjects))
}

/// POST /api/subjects
async fn create_subject(
    State(app_state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(input): Json<CreateSubjectInput>,
) -> AppResult<impl IntoResponse> {
    let subject = app_state.study_plan.create_subject(user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// PATCH /api/subjects/{id}
async fn update_subject(
    State(app_state): State<AppState>,
    Path(subject_id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(input): Json<UpdateSubjectInput>,
) -> AppResult<impl IntoResponse> {
    let subject = app_state
        .study_plan
        .update_subject(user_id, subject_id, &input)
        .await?;
    Ok(Json(subject))
}

/// DELETE /api/subjects/{id}
async fn delete_subject(
    State(app_state): State<AppState>,
    Path(subject_id): Path<Uuid>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    app_state
        .study_plan
        .delete_subject(user_id, subject_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list_subjects).post(create_subject))
        .route(
            "/subjects/{id}",
            patch(update_subject).delete(delete_subject),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware};
    use axum_test::TestServer;

    use crate::adapters::http::middleware::{entitlement_gate, require_auth};
    use crate::test_utils::{
        TestAppStateBuilder, bearer_header, create_test_entitlement_state, create_test_user,
    };

    fn server(app_state: AppState) -> TestServer {
        let router: Router = Router::new()
            .merge(router())
            .layer(middleware::from_fn_with_state(
                app_state.clone(),
                entitlement_gate,
            ))
            .layer(middleware::from_fn_with_state(
                app_state.clone(),
                require_auth,
            ))
            .with_state(app_state);
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_rejected() {
        let app_state = TestAppStateBuilder::new().build();

        let response = server(app_state).get("/subjects").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_without_entitlement_are_gated() {
        let user = create_test_user(|_| {});
        let app_state = TestAppStateBuilder::new().with_user(user.clone()).build();
        let auth = bearer_header(user.id, &app_state.config.jwt_secret);

        let response = server(app_state)
            .get("/subjects")
            .add_header(axum::http::HeaderName::from_static("authorization"), auth)
            .await;

        response.assert_status(StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn entitled_users_can_create_and_list_subjects() {
        let user = create_test_user(|_| {});
        let app_state = TestAppStateBuilder::new()
            .with_user(user.clone())
            .with_state(create_test_entitlement_state(user.id, |_| {}))
            .build();
        let auth = bearer_header(user.id, &app_state.config.jwt_secret);

        let created = server(app_state.clone())
            .post("/subjects")
            .add_header(
                axum::http::HeaderName::from_static("authorization"),
                auth.clone(),
            )
            .json(&serde_json::json!({"name": "Organic Chemistry"}))
            .await;
        created.assert_status(StatusCode::CREATED);

        let listed = server(app_state)
            .get("/subjects")
            .add_header(axum::http::HeaderName::from_static("authorization"), auth)
            .await;
        listed.assert_status(StatusCode::OK);
        let json: serde_json::Value = listed.json();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Organic Chemistry");
    }
}
