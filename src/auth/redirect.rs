//! Redirect decision engine.
//!
//! [`decide`] is the single source of truth for where an authenticated user
//! goes next. The OTP landing wraps it in [`OtpNavigation`] and the room
//! layout guard uses the same rules through [`decide_target`].

use crate::{
    i18n::{locale_of_path, path_for_locale, Locale, DEFAULT_LOCALE},
    models::InvestorSnapshot,
};

/// Query value the callback handler appends when a link fails to redeem.
pub const VERIFICATION_ERROR: &str = "Verification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Onboarding,
    Room,
    /// Already decoded.
    Callback(String),
}

impl Target {
    /// Concrete path for `locale`. Callbacks are used verbatim.
    pub fn path_for(&self, locale: Locale) -> String {
        match self {
            Target::Onboarding => path_for_locale(locale, "/onboarding"),
            Target::Room => path_for_locale(locale, "/room"),
            Target::Callback(url) => url.clone(),
        }
    }
}

/// Rule order matters: an incomplete profile goes to onboarding even if the
/// row is somehow approved. `None` means stay put (pending approval).
pub fn decide_target(investor: Option<&InvestorSnapshot>, callback: Option<&str>) -> Option<Target> {
    match investor {
        Some(i) if i.profile_complete && i.approved => Some(
            callback
                .map(decode_callback)
                .filter(|c| is_same_site_path(c))
                .map(Target::Callback)
                .unwrap_or(Target::Room),
        ),
        Some(i) if i.profile_complete => None,
        _ => Some(Target::Onboarding),
    }
}

/// `decide(investor, callback) -> path | None`, unprefixed paths.
pub fn decide(investor: Option<&InvestorSnapshot>, callback: Option<&str>) -> Option<String> {
    decide_target(investor, callback).map(|t| t.path_for(DEFAULT_LOCALE))
}

/// Callbacks arrive encoded once more than the query layer undoes.
pub fn decode_callback(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_owned())
}

/// A path a browser will keep on this origin: one leading `/`, no
/// backslashes and no control characters (browsers strip tabs and newlines,
/// which would turn `/\t/host` into `//host`).
pub fn is_same_site_path(path: &str) -> bool {
    path.starts_with('/')
        && !path[1..].starts_with('/')
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

pub fn is_otp_path(path: &str) -> bool {
    matches!(path, "/otp" | "/es/otp" | "/en/otp")
}

/// Request-scoped redirect state for one landing on the OTP page.
///
/// Issues at most one redirect per navigation, only from the OTP path, never
/// after a failed verification and never back to the OTP page itself.
#[derive(Debug, Clone)]
pub struct OtpNavigation {
    path:               String,
    locale:             Locale,
    callback:           Option<String>,
    verification_error: bool,
    redirected:         bool,
}

impl OtpNavigation {
    pub fn new(path: &str, callback: Option<String>, error: Option<&str>) -> Self {
        Self {
            path:               path.to_owned(),
            locale:             locale_of_path(path),
            callback,
            verification_error: error == Some(VERIFICATION_ERROR),
            redirected:         false,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn next_hop(&mut self, investor: Option<&InvestorSnapshot>) -> Option<String> {
        if self.redirected || self.verification_error || !is_otp_path(&self.path) {
            return None;
        }

        let target = decide_target(investor, self.callback.as_deref())?.path_for(self.locale);
        if target == path_for_locale(self.locale, "/otp") {
            return None;
        }

        self.redirected = true;
        Some(target)
    }
}
