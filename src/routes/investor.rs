//! `/investor` routes. Both act on the investor row keyed by the session email.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::session::Session,
    errors::{AppError, AppResult},
    models::ProfileUpdate,
    state::AppState,
};

#[derive(Deserialize)]
struct UpdateInvestorRequest {
    name:    Option<String>,
    phone:   Option<String>,
    company: Option<String>,
}

impl UpdateInvestorRequest {
    fn into_profile(self) -> AppResult<ProfileUpdate> {
        let name = trimmed(self.name).ok_or_else(|| AppError::BadRequest("Name is required".into()))?;
        Ok(ProfileUpdate {
            name,
            phone:   trimmed(self.phone),
            company: trimmed(self.company),
        })
    }
}

/// Blank optional fields are stored as NULL.
fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/investor/update", post(update))
        .route("/investor/me",     get(me))
}

/// POST /investor/update: complete or edit the onboarding profile.
async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateInvestorRequest>,
) -> AppResult<Json<Value>> {
    let profile = body.into_profile()?;
    let investor = state
        .store
        .update_profile(&session.user.email, &session.user.id, &profile, Utc::now().naive_utc())
        .await?;

    tracing::info!(email = %investor.email, "Investor profile updated");
    Ok(Json(json!({
        "investor": investor,
        "message":  "Profile updated successfully",
    })))
}

/// GET /investor/me
async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Value>> {
    let investor = state
        .store
        .find_investor(&session.user.email)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "investor": investor })))
}
