//! `/admin` routes: investor approval and invitations.
//! Every route requires a session whose email is on the founder allow-list
//! (`require_session` from `api_routes`, then `require_founder` here).

use axum::{
    extract::{Extension, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{email::access_email, normalize_email, session::Session},
    errors::{AppError, AppResult},
    middleware::role_guard::require_founder,
    models::Investor,
    state::AppState,
};

const LIST_LIMIT: u32 = 100;

pub fn router(state: AppState) -> Router<AppState> {
    let founder_guard = middleware::from_fn_with_state(state, require_founder);
    Router::new()
        .route("/admin/investors",                  get(list_investors))
        .route("/admin/investor/approve",           post(approve))
        .route("/admin/investor/resend-invitation", post(resend_invitation))
        .route_layer(founder_guard)
}

#[derive(Deserialize)]
struct EmailBody {
    email: Option<String>,
}

impl EmailBody {
    fn email(&self) -> AppResult<String> {
        match self.email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => normalize_email(raw),
            _ => Err(AppError::BadRequest("Missing email".into())),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────

async fn list_investors(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let investors: Vec<Investor> = state.store.list_investors(LIST_LIMIT).await?;
    Ok(Json(json!({ "investors": investors })))
}

/// POST /admin/investor/approve: approve and send the access email.
///
/// The provider is checked before the row is touched so an investor is never
/// approved without being told.
async fn approve(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<EmailBody>,
) -> AppResult<Json<Value>> {
    let email = body.email()?;
    let mailer = state.mailer()?;
    let now = Utc::now().naive_utc();

    let approval = state
        .store
        .approve_investor(&email, &session.user.email, now)
        .await?
        .ok_or(AppError::NotFound)?;
    if approval.already_approved {
        tracing::info!(email = %email, "Investor already approved; re-sending access email");
    }

    mailer
        .send(&access_email(&approval.investor.email, &state.config.app_base_url, false))
        .await?;
    state.store.mark_magic_link_sent(&email, now).await?;

    tracing::info!(email = %email, approved_by = %session.user.email, "Investor approved");
    Ok(Json(json!({ "ok": true })))
}

/// POST /admin/investor/resend-invitation: works for unknown emails too;
/// the investor row is created unapproved.
async fn resend_invitation(
    State(state): State<AppState>,
    Json(body): Json<EmailBody>,
) -> AppResult<Json<Value>> {
    let email = body.email()?;
    let mailer = state.mailer()?;
    let now = Utc::now().naive_utc();

    let investor = state.store.ensure_investor(&email, now).await?;
    mailer
        .send(&access_email(&investor.email, &state.config.app_base_url, investor.approved))
        .await?;
    state.store.mark_magic_link_sent(&email, now).await?;

    tracing::info!(email = %email, approved = investor.approved, "Access email sent");
    Ok(Json(json!({ "ok": true })))
}
