use crate::commands::{current_thread_runtime, CommandResult};
use orderbot_core::config::{AppConfig, DatabaseBackend, LoadOptions};
use orderbot_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    if config.database.backend == DatabaseBackend::Memory {
        return CommandResult::success("migrate", "memory backend has no schema to migrate");
    }

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let outcome = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8));
        pool.close().await;
        outcome
    });

    match result {
        Ok(()) => CommandResult::success(
            "migrate",
            format!("applied pending migrations to {}", config.database.redacted_url()),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
