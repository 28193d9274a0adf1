//! Shared imports for route modules.

// Core framework - re-exported for use by sibling modules
pub use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
pub use serde::{Deserialize, Serialize};
pub use tracing::error;
pub use uuid::Uuid;

// App-level imports
pub use crate::adapters::http::app_state::AppState;
pub use crate::adapters::http::middleware::AuthUser;
pub use crate::app_error::{AppError, AppResult};
