//! Founder authorization guard. Must run inside `require_session`.

use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::session::Session;
use crate::errors::AppError;
use crate::state::AppState;

/// Middleware: require the session email to be on the founder allow-list.
/// Non-founders get a plain 401, with nothing about the resource.
pub async fn require_founder(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.is_founder(&session.user.email) {
        tracing::warn!(email = %session.user.email, "Admin action refused: not a founder");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(req).await)
}
