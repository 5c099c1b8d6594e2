//! Locale middleware for page requests.
//!
//! Runs before routing so that a rewrite changes which route matches:
//!
//! * `/es/...` redirects to the unprefixed path (the default is never prefixed)
//! * `/en/...` passes through
//! * anything else resolves a locale (cookie, then `Accept-Language`); Spanish
//!   is rewritten internally to `/es/...`, English is redirected to `/en/...`.
//!   Either way the resolved locale is written back to the cookie.

use axum::{
    extract::Request,
    http::{header, uri::PathAndQuery, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::{cookie::time::Duration as CookieDuration, Cookie, Cookies};

use crate::i18n::{
    path_for_locale, resolve_locale, strip_locale_prefix, Locale, LOCALE_COOKIE, LOCALE_COOKIE_DAYS,
};

const STATIC_EXTENSIONS: [&str; 8] = ["svg", "png", "jpg", "jpeg", "gif", "webp", "ico", "mp4"];
const EXCLUDED_PREFIXES: [&str; 4] = ["/api", "/assets", "/_next", "/health"];

/// Only page paths are localized; API, health and static assets are not.
pub fn is_page_path(path: &str) -> bool {
    if path.starts_with("/favicon") {
        return false;
    }
    let excluded = EXCLUDED_PREFIXES
        .iter()
        .any(|p| path.strip_prefix(p).is_some_and(|rest| rest.is_empty() || rest.starts_with('/')));
    if excluded {
        return false;
    }

    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext)) => !STATIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => true,
    }
}

pub async fn handle_locale(cookies: Cookies, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if !is_page_path(&path) {
        return next.run(req).await;
    }
    let query = req.uri().query().map(|q| format!("?{q}")).unwrap_or_default();

    if let Some(rest) = strip_locale_prefix(&path, Locale::Es) {
        return Redirect::temporary(&format!("{rest}{query}")).into_response();
    }
    if strip_locale_prefix(&path, Locale::En).is_some() {
        return next.run(req).await;
    }

    let cookie_value = cookies.get(LOCALE_COOKIE).map(|c| c.value().to_owned());
    let accept_language = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let locale = resolve_locale(cookie_value.as_deref(), accept_language.as_deref());
    set_locale_cookie(&cookies, locale);

    match locale {
        Locale::Es => {
            let rewritten = format!("/{}{path}{query}", Locale::Es);
            match rewrite_uri(req.uri(), &rewritten) {
                Some(uri) => {
                    *req.uri_mut() = uri;
                    next.run(req).await
                }
                None => StatusCode::BAD_REQUEST.into_response(),
            }
        }
        Locale::En => {
            Redirect::temporary(&format!("{}{query}", path_for_locale(Locale::En, &path))).into_response()
        }
    }
}

fn rewrite_uri(original: &Uri, path_and_query: &str) -> Option<Uri> {
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

fn set_locale_cookie(cookies: &Cookies, locale: Locale) {
    let cookie = Cookie::build((LOCALE_COOKIE, locale.as_str()))
        .path("/")
        .max_age(CookieDuration::days(LOCALE_COOKIE_DAYS))
        .build();
    cookies.add(cookie);
}
