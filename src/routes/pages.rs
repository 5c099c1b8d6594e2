//! Locale-prefixed page routes. Requests reach these only after the locale
//! middleware has rewritten or redirected them, so the first segment is
//! always a locale; anything else is a 404.
//!
//! Pages answer with small JSON view models. The OTP landing and the room
//! layout make their redirect decisions here, server-side.

use axum::{
    extract::{Path, Query, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_cookies::Cookies;

use crate::{
    auth::{
        redirect::{decide_target, decode_callback, is_same_site_path, OtpNavigation, Target},
        session::{build_session, read_claims, Session},
    },
    errors::{AppError, AppResult},
    i18n::{path_for_locale, Locale},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{locale}",                 get(home))
        .route("/{locale}/",                get(home))
        .route("/{locale}/otp",             get(otp))
        .route("/{locale}/onboarding",      get(onboarding))
        .route("/{locale}/room",            get(room))
        .route("/{locale}/room/{*section}", get(room_section))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpParams {
    callback_url: Option<String>,
    error:        Option<String>,
}

fn parse_locale(raw: &str) -> AppResult<Locale> {
    Locale::parse(raw).ok_or(AppError::NotFound)
}

/// The enriched session for the request cookie, if there is a valid one.
async fn current_session(state: &AppState, cookies: &Cookies) -> AppResult<Option<Session>> {
    match read_claims(cookies, &state.keys) {
        Some(claims) => Ok(Some(build_session(state.store.as_ref(), &claims).await?)),
        None => Ok(None),
    }
}

/// Only same-site absolute paths survive as a post-login destination. The
/// check runs on both the value as received and its decoded form, since the
/// redirect engine decodes it again before use.
fn same_site_callback(raw: Option<String>) -> Option<String> {
    raw.filter(|c| is_same_site_path(c) && is_same_site_path(&decode_callback(c)))
}

// ── Handlers ──────────────────────────────────────────────────

async fn home(Path(locale): Path<String>) -> AppResult<Json<serde_json::Value>> {
    let locale = parse_locale(&locale)?;
    Ok(Json(json!({ "view": "home", "locale": locale })))
}

/// GET /{locale}/otp: sign-in landing. An authenticated visitor is sent on
/// at most once; everyone else gets the sign-in form.
async fn otp(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(locale): Path<String>,
    uri: Uri,
    Query(params): Query<OtpParams>,
) -> AppResult<Response> {
    let locale = parse_locale(&locale)?;
    let callback = same_site_callback(params.callback_url);
    let mut navigation = OtpNavigation::new(uri.path(), callback.clone(), params.error.as_deref());

    let session = current_session(&state, &cookies).await?;
    if let Some(session) = &session {
        if let Some(target) = navigation.next_hop(session.investor.as_ref()) {
            tracing::debug!(email = %session.user.email, %target, "OTP landing redirect");
            return Ok(Redirect::temporary(&target).into_response());
        }
    }

    let pending = session
        .as_ref()
        .and_then(|s| s.investor.as_ref())
        .is_some_and(|i| i.profile_complete && !i.approved);
    Ok(Json(json!({
        "view":          "otp",
        "locale":        locale,
        "authenticated": session.is_some(),
        "pending":       pending,
        "error":         params.error,
        "callbackUrl":   callback,
    }))
    .into_response())
}

/// GET /{locale}/onboarding: profile form, prefilled from the investor row.
async fn onboarding(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(locale): Path<String>,
) -> AppResult<Response> {
    let locale = parse_locale(&locale)?;
    let Some(session) = current_session(&state, &cookies).await? else {
        return Ok(Redirect::temporary(&path_for_locale(locale, "/otp")).into_response());
    };
    Ok(Json(json!({
        "view":     "onboarding",
        "locale":   locale,
        "email":    session.user.email,
        "investor": session.investor,
    }))
    .into_response())
}

async fn room(
    state: State<AppState>,
    cookies: Cookies,
    Path(locale): Path<String>,
) -> AppResult<Response> {
    room_layout(state, cookies, locale, None).await
}

async fn room_section(
    state: State<AppState>,
    cookies: Cookies,
    Path((locale, section)): Path<(String, String)>,
) -> AppResult<Response> {
    room_layout(state, cookies, locale, Some(section)).await
}

/// Room layout guard. The edge middleware has already checked the JWT; this
/// is where pending and approved investors are told apart.
async fn room_layout(
    State(state): State<AppState>,
    cookies: Cookies,
    locale: String,
    section: Option<String>,
) -> AppResult<Response> {
    let locale = parse_locale(&locale)?;
    let Some(session) = current_session(&state, &cookies).await? else {
        return Ok(Redirect::temporary(&path_for_locale(locale, "/otp")).into_response());
    };

    match decide_target(session.investor.as_ref(), None) {
        Some(Target::Onboarding) => {
            Ok(Redirect::temporary(&path_for_locale(locale, "/onboarding")).into_response())
        }
        None => Ok(Json(json!({ "view": "pending", "locale": locale })).into_response()),
        Some(_) => Ok(Json(json!({
            "view":     "room",
            "locale":   locale,
            "section":  section,
            "investor": session.investor,
        }))
        .into_response()),
    }
}
