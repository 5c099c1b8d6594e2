use std::time::Duration;

use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    MySqlPool,
};

use crate::config::Config;

/// Process-wide pool, shared through `AppState` behind `MySqlStore`.
pub type Db = MySqlPool;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings built field by field, so passwords need no URL escaping.
fn connect_options(config: &Config) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .password(&config.db_password)
        .database(&config.db_name)
}

pub async fn connect(config: &Config) -> anyhow::Result<Db> {
    let pool = MySqlPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(config))
        .await?;

    tracing::info!(host = %config.db_host, db = %config.db_name, "MySQL pool ready");
    Ok(pool)
}

/// Apply the embedded identity schema (`migrations/`).
pub async fn run_migrations(pool: &Db) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Identity schema up to date");
    Ok(())
}
