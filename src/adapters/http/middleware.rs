use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::jwt,
};

/// Authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Verifies the session token (bearer header or cookie) and attaches the
/// caller's user id. Session issuance lives outside this service; only
/// verification happens here.
pub async fn require_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| cookie_token(request.headers()))
        .ok_or(AppError::InvalidCredentials)?;

    let claims = jwt::verify(&token, &app_state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

/// Access gate: blocks protected routes until the reconciliation reader
/// confirms an active entitlement.
///
/// A store failure surfaces as a 5xx rather than a lockout, so a transient
/// read problem is distinguishable from a confirmed non-entitlement.
pub async fn entitlement_gate(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let AuthUser(user_id) = *request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::InvalidCredentials)?;

    let summary = app_state.billing_sync.get_entitlement(user_id).await?;
    if !summary.is_active {
        return Err(AppError::PaymentRequired);
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get("access_token")
        .map(|c| c.value().to_string())
}
