//! Authentication guards.
//!
//! * [`require_session`] protects API routes: verifies the `session` JWT,
//!   rebuilds the enriched [`Session`] from the store and injects it as an
//!   extension for downstream handlers.
//! * [`require_session_edge`] runs in front of page routing and only checks
//!   the JWT. It cannot tell pending from approved; the room handler does that.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use crate::{
    auth::session::{build_session, read_claims, Session},
    errors::AppError,
    i18n::{path_for_locale, strip_locale_prefix, Locale},
    state::AppState,
};

/// Middleware: require a valid session cookie.
/// On success, inserts the enriched `Session` into request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = read_claims(&cookies, &state.keys).ok_or(AppError::Unauthorized)?;
    let session: Session = build_session(state.store.as_ref(), &claims).await?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Middleware: redirect room requests without a valid session to the
/// locale-aware `/otp`. Sees paths after the locale rewrite (`/es/room`).
pub async fn require_session_edge(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request,
    next: Next,
) -> Response {
    if let Some(locale) = room_locale(req.uri().path()) {
        if read_claims(&cookies, &state.keys).is_none() {
            tracing::debug!(path = %req.uri().path(), "No session at the edge; redirecting to OTP");
            return Redirect::temporary(&path_for_locale(locale, "/otp")).into_response();
        }
    }
    next.run(req).await
}

/// Locale of a room path (`/{locale}/room` or below), `None` for anything else.
fn room_locale(path: &str) -> Option<Locale> {
    Locale::ALL.into_iter().find(|locale| {
        strip_locale_prefix(path, *locale)
            .is_some_and(|rest| rest == "/room" || rest.starts_with("/room/"))
    })
}
