use std::time::Duration;

use orderbot_core::config::{DatabaseConfig, MAX_POOL_CONNECTIONS};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub type DbPool = sqlx::PgPool;

pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(config.password.expose_secret())
        .database(&config.name)
}

fn pool_options(min_connections: u32, max_connections: u32, timeout_secs: u64) -> PgPoolOptions {
    let max_connections = max_connections.clamp(1, MAX_POOL_CONNECTIONS);
    PgPoolOptions::new()
        .min_connections(min_connections.clamp(1, max_connections))
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
}

/// Opens the pool and waits for the first connection, so bad credentials or an unreachable
/// host surface here.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    pool_options(config.min_connections, config.max_connections, config.acquire_timeout_secs)
        .connect_with(connect_options(config))
        .await
}

/// Builds the pool without connecting; every acquire attempts a fresh connection and reports
/// connectivity errors to its caller.
pub fn connect_lazy(config: &DatabaseConfig) -> DbPool {
    pool_options(config.min_connections, config.max_connections, config.acquire_timeout_secs)
        .connect_lazy_with(connect_options(config))
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    pool_options(1, max_connections, timeout_secs).connect(database_url).await
}

#[cfg(test)]
mod tests {
    use orderbot_core::config::AppConfig;

    use super::{connect_lazy, connect_options};

    #[test]
    fn connect_options_carry_configured_credentials() {
        let mut config = AppConfig::default().database;
        config.host = "db.internal".to_string();
        config.port = 6543;
        config.name = "kitchen".to_string();

        let options = connect_options(&config);

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("kitchen"));
    }

    #[tokio::test]
    async fn lazy_pool_reports_unreachable_database_per_operation() {
        let mut config = AppConfig::default().database;
        config.host = "127.0.0.1".to_string();
        config.port = 1;
        config.acquire_timeout_secs = 1;

        let pool = connect_lazy(&config);
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await;

        assert!(result.is_err(), "nothing listens on port 1");
        pool.close().await;
    }
}
