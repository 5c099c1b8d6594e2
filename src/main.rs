use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod db;
mod errors;
mod i18n;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use auth::{email::mailer_from_config, session::SessionKeys};
use services::calendar::GoogleCalendar;
use state::AppState;
use store::MySqlStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ───────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Config ────────────────────────────────────────────────
    let config = config::Config::from_env()?;
    tracing::info!(env = %config.app_env, base_url = %config.app_base_url, "Starting investor room backend");
    if !config.secure_cookies() {
        // Secure is keyed off APP_BASE_URL, not APP_ENV.
        if config.is_development() {
            tracing::info!("APP_BASE_URL is not https; session cookies are sent without the Secure flag");
        } else {
            tracing::warn!(env = %config.app_env, "APP_BASE_URL is not https; session cookies are sent without the Secure flag");
        }
    }
    if config.founder_emails.is_empty() {
        tracing::warn!("FOUNDER_EMAIL is empty; admin routes will reject everyone");
    }

    // ── Database ──────────────────────────────────────────────
    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;

    // ── Integrations ──────────────────────────────────────────
    let mailer = mailer_from_config(&config)?;
    let calendar = GoogleCalendar::from_config(&config)?;
    if !config.calendar_configured() {
        tracing::info!("Google Calendar not configured; meeting booking uses the static Meet link");
    }

    // Read address before moving config into state
    let addr: SocketAddr = format!("{}:{}", config.backend_host, config.backend_port).parse()?;

    let app_state = AppState {
        store: Arc::new(MySqlStore::new(pool)),
        keys: SessionKeys::new(&config.session_secret),
        mailer,
        calendar,
        config,
    };

    // ── Router ────────────────────────────────────────────────
    let app = routes::app(app_state);
    tracing::info!(%addr, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
