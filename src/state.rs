//! Shared application state: injected into every handler via `axum::extract::State`.

use std::sync::Arc;

use crate::{
    auth::{email::Mailer, session::SessionKeys},
    config::Config,
    errors::{AppError, AppResult},
    services::calendar::GoogleCalendar,
    store::IdentityStore,
};

/// Application-wide state passed via axum `State<AppState>`.
///
/// Everything here is cheap to clone: the store and mailer are behind `Arc`,
/// the JWT keys and calendar client are small, and `Config` holds only
/// strings and primitives.
#[derive(Clone)]
pub struct AppState {
    pub store:    Arc<dyn IdentityStore>,
    pub config:   Config,
    pub keys:     SessionKeys,
    pub mailer:   Option<Arc<dyn Mailer>>,
    pub calendar: Option<GoogleCalendar>,
}

impl AppState {
    /// The configured email provider, or a configuration error naming the
    /// missing setting. Admin actions never degrade silently.
    pub fn mailer(&self) -> AppResult<Arc<dyn Mailer>> {
        self.mailer.clone().ok_or_else(|| {
            AppError::Configuration("Email provider not configured (set RESEND_API_KEY)".into())
        })
    }
}
