//! Locales and locale-aware paths. Spanish is the default and is never
//! prefixed; English lives under `/en`.

use std::fmt;

use serde::Serialize;

pub const LOCALE_COOKIE: &str = "NEXT_LOCALE";
pub const LOCALE_COOKIE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Es,
    En,
}

pub const DEFAULT_LOCALE: Locale = Locale::Es;

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Es, Locale::En];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Locale::ALL.into_iter().find(|l| l.as_str() == value)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path with the locale prefix when needed: `("/otp", Es)` → `/otp`,
/// `("/otp", En)` → `/en/otp`, `("/", En)` → `/en`.
pub fn path_for_locale(locale: Locale, path: &str) -> String {
    let normalized = if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };

    if locale == DEFAULT_LOCALE {
        return normalized;
    }
    if normalized == "/" {
        format!("/{locale}")
    } else {
        format!("/{locale}{normalized}")
    }
}

/// Remainder of `path` after a `/{locale}` segment, or `None` if the path is
/// not under that locale. `/en` → `/`, `/en/room` → `/room`, `/english` → `None`.
pub fn strip_locale_prefix(path: &str, locale: Locale) -> Option<&str> {
    let rest = path.strip_prefix('/')?.strip_prefix(locale.as_str())?;
    match rest {
        "" => Some("/"),
        r if r.starts_with('/') => Some(r),
        _ => None,
    }
}

/// Locale a (possibly rewritten) page path belongs to.
pub fn locale_of_path(path: &str) -> Locale {
    Locale::ALL
        .into_iter()
        .find(|l| strip_locale_prefix(path, *l).is_some())
        .unwrap_or(DEFAULT_LOCALE)
}

/// Pick the best supported locale for an `Accept-Language` header.
///
/// Entries are ordered by q-value (stable for ties), matched on their primary
/// subtag; `*` selects the default and `q=0` entries are ignored.
pub fn negotiate(accept_language: &str) -> Locale {
    let mut ranges: Vec<(String, f32)> = accept_language
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let tag = parts.next()?.trim().to_ascii_lowercase();
            if tag.is_empty() {
                return None;
            }
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q=").map(str::to_owned))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then_some((tag, q))
        })
        .collect();

    ranges.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (tag, _) in ranges {
        if tag == "*" {
            return DEFAULT_LOCALE;
        }
        let primary = tag.split('-').next().unwrap_or_default();
        if let Some(locale) = Locale::parse(primary) {
            return locale;
        }
    }
    DEFAULT_LOCALE
}

/// Locale precedence: explicit cookie, then `Accept-Language`, then default.
pub fn resolve_locale(cookie: Option<&str>, accept_language: Option<&str>) -> Locale {
    if let Some(locale) = cookie.and_then(Locale::parse) {
        return locale;
    }
    accept_language.map(negotiate).unwrap_or(DEFAULT_LOCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_locale_is_unprefixed() {
        assert_eq!(path_for_locale(Locale::Es, "/otp"), "/otp");
        assert_eq!(path_for_locale(Locale::Es, ""), "/");
        assert_eq!(path_for_locale(Locale::En, "/"), "/en");
        assert_eq!(path_for_locale(Locale::En, "room"), "/en/room");
    }

    #[test]
    fn prefix_stripping_respects_segments() {
        assert_eq!(strip_locale_prefix("/en", Locale::En), Some("/"));
        assert_eq!(strip_locale_prefix("/en/room/files", Locale::En), Some("/room/files"));
        assert_eq!(strip_locale_prefix("/english", Locale::En), None);
        assert_eq!(strip_locale_prefix("/room", Locale::Es), None);
        assert_eq!(locale_of_path("/en/otp"), Locale::En);
        assert_eq!(locale_of_path("/es/otp"), Locale::Es);
        assert_eq!(locale_of_path("/otp"), Locale::Es);
    }

    #[test]
    fn negotiation_follows_quality() {
        assert_eq!(negotiate("en-US"), Locale::En);
        assert_eq!(negotiate("en-US,en;q=0.9,es;q=0.8"), Locale::En);
        assert_eq!(negotiate("fr-FR, es;q=0.5, en;q=0.7"), Locale::En);
        assert_eq!(negotiate("de, es-AR;q=0.9"), Locale::Es);
        assert_eq!(negotiate("en;q=0, fr"), Locale::Es);
        assert_eq!(negotiate("*"), Locale::Es);
        assert_eq!(negotiate(""), Locale::Es);
    }

    #[test]
    fn cookie_beats_header() {
        assert_eq!(resolve_locale(Some("es"), Some("en-US")), Locale::Es);
        assert_eq!(resolve_locale(Some("xx"), Some("en-US")), Locale::En);
        assert_eq!(resolve_locale(None, None), Locale::Es);
    }
}
