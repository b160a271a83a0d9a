use std::sync::Arc;

use orderbot_core::config::{AppConfig, DatabaseBackend};
use orderbot_db::{
    connect, connect_lazy, migrations, DbPool, InMemoryOrderRepository, OrderRepository,
    PgOrderRepository,
};
use tera::Tera;
use thiserror::Error;
use tracing::{error, info};

use crate::assistant::OrderAssistant;
use crate::health::HealthState;
use crate::home;
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    /// `None` when orders are kept in memory.
    pub db_pool: Option<DbPool>,
    pub assistant: Arc<OrderAssistant>,
    pub templates: Arc<Tera>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState {
            assistant: Arc::clone(&self.assistant),
            templates: Arc::clone(&self.templates),
            health: HealthState::new(self.db_pool.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        backend = ?config.database.backend,
        "starting application bootstrap"
    );

    let (db_pool, orders): (Option<DbPool>, Arc<dyn OrderRepository>) =
        match config.database.backend {
            DatabaseBackend::Memory => {
                info!(
                    event_name = "system.bootstrap.memory_store",
                    correlation_id = "bootstrap",
                    "orders are kept in process memory"
                );
                let orders: Arc<dyn OrderRepository> =
                    Arc::new(InMemoryOrderRepository::default());
                (None, orders)
            }
            DatabaseBackend::Postgres => {
                let pool = open_pool(&config).await?;
                let orders: Arc<dyn OrderRepository> =
                    Arc::new(PgOrderRepository::new(pool.clone()));
                (Some(pool), orders)
            }
        };

    let templates = home::init_templates(&config.server.templates_dir);

    Ok(Application {
        config,
        db_pool,
        assistant: Arc::new(OrderAssistant::new(orders)),
        templates,
    })
}

/// An unreachable database does not stop startup: the pool is built lazily and each request
/// reports its own failure until the database comes back.
async fn open_pool(config: &AppConfig) -> Result<DbPool, BootstrapError> {
    let database_url = config.database.redacted_url();

    match connect(&config.database).await {
        Ok(pool) => {
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                database_url = %database_url,
                "database connection established"
            );
            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );
            Ok(pool)
        }
        Err(connect_error) => {
            error!(
                event_name = "system.bootstrap.database_unavailable",
                correlation_id = "bootstrap",
                database_url = %database_url,
                error = %connect_error,
                "database connection failed; continuing with a lazy pool"
            );
            Ok(connect_lazy(&config.database))
        }
    }
}

#[cfg(test)]
mod tests {
    use orderbot_core::config::{AppConfig, DatabaseBackend};
    use orderbot_core::domain::order::OrderId;
    use orderbot_core::domain::session::SessionId;
    use orderbot_core::intent::IntentParameters;
    use orderbot_core::replies;

    use crate::bootstrap::bootstrap_with_config;

    #[tokio::test]
    async fn memory_backend_boots_without_database() {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Memory;

        let app = bootstrap_with_config(config).await.expect("memory backend should boot");

        assert!(app.db_pool.is_none());
        assert!(app.assistant.sessions().is_empty());
    }

    #[tokio::test]
    async fn unreachable_database_still_boots_and_reports_backend_errors() {
        let mut config = AppConfig::default();
        config.database.host = "127.0.0.1".to_string();
        config.database.port = 1;
        config.database.acquire_timeout_secs = 1;

        let app = bootstrap_with_config(config)
            .await
            .expect("startup should tolerate an unreachable database");
        assert!(app.db_pool.is_some());

        let text = app.assistant.track_order(&IntentParameters::default()).await;
        assert_eq!(text, replies::status_lookup_failed(OrderId(0)));

        let session = SessionId("boot".to_string());
        let text = app.assistant.complete_order(&session).await;
        assert_eq!(text, replies::ORDER_NOT_FOUND_IN_SESSION);
    }
}
