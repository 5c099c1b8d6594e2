use dotenvy::dotenv;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub db_host:          String,
    pub db_port:          u16,
    pub db_name:          String,
    pub db_user:          String,
    pub db_password:      String,

    // Backend
    pub backend_host:     String,
    pub backend_port:     u16,

    // Session (JWT signing key, also salts stored verification tokens)
    pub session_secret:   String,

    // Email: Resend HTTP API first, SMTP as fallback
    pub resend_api_key:   Option<String>,
    pub smtp_host:        String,
    pub smtp_port:        u16,
    pub smtp_user:        String,
    pub smtp_password:    String,
    pub email_from:       String,

    // Admin
    pub founder_emails:   Vec<String>,

    // Calendar (optional, booking degrades to a static link)
    pub google_client_id:     Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_calendar_id:   String,
    pub google_meet_link:     Option<String>,

    // App
    pub app_env:          String,
    pub app_base_url:     String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        fn require(key: &str) -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        }

        fn parse_port(key: &str) -> Result<u16, ConfigError> {
            let raw = require(key)?;
            raw.parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw))
        }

        /// Unset and blank are treated the same.
        fn optional(key: &str) -> Option<String> {
            env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
        }

        let session_secret = require("SESSION_SECRET")?;
        if session_secret.len() < 16 {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET".into(),
                "must be at least 16 characters".into(),
            ));
        }

        Ok(Self {
            db_host:      require("DB_HOST").unwrap_or_else(|_| "db".into()),
            db_port:      parse_port("DB_PORT").unwrap_or(3306),
            db_name:      require("DB_NAME")?,
            db_user:      require("DB_USER")?,
            db_password:  require("DB_PASSWORD")?,

            backend_host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            backend_port: parse_port("BACKEND_PORT").unwrap_or(8080),

            session_secret,

            resend_api_key: optional("RESEND_API_KEY"),
            smtp_host:     env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port:     env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(587),
            smtp_user:     env::var("SMTP_USER").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            email_from:    optional("EMAIL_FROM").unwrap_or_else(|| "onboarding@resend.dev".into()),

            founder_emails: parse_founders(&env::var("FOUNDER_EMAIL").unwrap_or_default()),

            google_client_id:     optional("GOOGLE_CLIENT_ID"),
            google_client_secret: optional("GOOGLE_CLIENT_SECRET"),
            google_refresh_token: optional("GOOGLE_REFRESH_TOKEN"),
            google_calendar_id:   optional("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".into()),
            google_meet_link:     optional("GOOGLE_MEET_LINK"),

            app_env:      env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3011".into())
                .trim_end_matches('/')
                .to_owned(),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }

    /// Session cookies are only marked `Secure` when the site is served over TLS.
    pub fn secure_cookies(&self) -> bool {
        self.app_base_url.starts_with("https://")
    }

    /// Case-insensitive membership check against the founder allow-list.
    pub fn is_founder(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.founder_emails.iter().any(|f| *f == email)
    }

    pub fn calendar_configured(&self) -> bool {
        self.google_client_id.is_some()
            && self.google_client_secret.is_some()
            && self.google_refresh_token.is_some()
    }
}

/// Split the comma-separated `FOUNDER_EMAIL` value into trimmed, lower-cased
/// addresses, dropping blanks.
pub fn parse_founders(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
