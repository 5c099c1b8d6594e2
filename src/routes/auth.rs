use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_cookies::Cookies;

use crate::{
    auth::{
        magic_link::{issue_link, redeem},
        redirect::VERIFICATION_ERROR,
        session::{clear_session_cookie, set_session_cookie, Session},
    },
    errors::AppResult,
    i18n::{path_for_locale, Locale, DEFAULT_LOCALE, LOCALE_COOKIE},
    state::AppState,
};

// ── Request types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest {
    email:        String,
    callback_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackParams {
    identifier:   Option<String>,
    token:        Option<String>,
    callback_url: Option<String>,
}

// ── Router ────────────────────────────────────────────────────

/// Routes reachable without a session.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signin/email",   post(sign_in))
        .route("/auth/callback/email", get(callback))
        .route("/auth/signout",        post(sign_out))
}

/// Routes mounted behind `require_session`.
pub fn router() -> Router<AppState> {
    Router::new().route("/auth/session", get(session))
}

// ── Handlers ──────────────────────────────────────────────────

/// POST /auth/signin/email: mail a one-time sign-in link.
async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    issue_link(&state, &body.email, body.callback_url.as_deref()).await?;
    Ok(Json(json!({ "ok": true })))
}

/// GET /auth/callback/email: redeem the link and land on the OTP page,
/// which decides where the user goes next.
async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> AppResult<Redirect> {
    let locale = cookies
        .get(LOCALE_COOKIE)
        .and_then(|c| Locale::parse(c.value()))
        .unwrap_or(DEFAULT_LOCALE);
    let otp = path_for_locale(locale, "/otp");

    let credential = match (params.identifier.as_deref(), params.token.as_deref()) {
        (Some(identifier), Some(token)) => redeem(&state, identifier, token).await?,
        _ => None,
    };
    let Some(credential) = credential else {
        return Ok(Redirect::temporary(&format!("{otp}?error={VERIFICATION_ERROR}")));
    };

    set_session_cookie(&cookies, &credential, state.config.secure_cookies());

    let target = match params.callback_url.filter(|c| !c.is_empty()) {
        Some(cb) => format!("{otp}?callbackUrl={}", urlencoding::encode(&cb)),
        None => otp,
    };
    Ok(Redirect::temporary(&target))
}

/// GET /auth/session: the enriched session for the current cookie.
async fn session(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

/// POST /auth/signout: the JWT is stateless, so dropping the cookie is all
/// there is to it.
async fn sign_out(cookies: Cookies) -> StatusCode {
    clear_session_cookie(&cookies);
    StatusCode::NO_CONTENT
}
