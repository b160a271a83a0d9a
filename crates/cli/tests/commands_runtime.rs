use std::env;
use std::sync::{Mutex, OnceLock};

use orderbot_cli::commands::{config, doctor, migrate};
use serde_json::Value;

const UNREACHABLE_DATABASE: &[(&str, &str)] = &[
    ("ORDERBOT_DATABASE_BACKEND", "postgres"),
    ("DB_HOST", "127.0.0.1"),
    ("DB_PORT", "1"),
    ("ORDERBOT_DATABASE_ACQUIRE_TIMEOUT_SECS", "1"),
];

#[test]
fn migrate_returns_config_failure_for_oversized_pool() {
    with_env(&[("ORDERBOT_DATABASE_MAX_CONNECTIONS", "50")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_is_a_noop_for_the_memory_backend() {
    with_env(&[("ORDERBOT_DATABASE_BACKEND", "memory")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_unreachable_database() {
    with_env(UNREACHABLE_DATABASE, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4, "expected connectivity failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn doctor_skips_database_checks_for_memory_backend() {
    with_env(&[("ORDERBOT_DATABASE_BACKEND", "memory")], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_fails_when_database_is_unreachable() {
    with_env(UNREACHABLE_DATABASE, || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][1]["name"], "database_connectivity");
        assert_eq!(payload["checks"][1]["status"], "fail");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_human_output_reports_invalid_config() {
    with_env(&[("DB_PORT", "not-a-port")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("DB_PORT"));
    });
}

#[test]
fn config_attributes_alias_env_and_redacts_password() {
    with_env(&[("DB_HOST", "db.internal"), ("DB_PASSWORD", "hunter2")], || {
        let output = config::run();

        assert!(output.contains("- database.host = db.internal (source: env (DB_HOST))"));
        assert!(output.contains("- database.password = <redacted> (source: env (DB_PASSWORD))"));
        assert!(output.contains("- server.port = 8000 (source: default)"));
        assert!(!output.contains("hunter2"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ORDERBOT_DATABASE_BACKEND",
        "ORDERBOT_DATABASE_HOST",
        "ORDERBOT_DATABASE_PORT",
        "ORDERBOT_DATABASE_USER",
        "ORDERBOT_DATABASE_PASSWORD",
        "ORDERBOT_DATABASE_NAME",
        "ORDERBOT_DATABASE_MIN_CONNECTIONS",
        "ORDERBOT_DATABASE_MAX_CONNECTIONS",
        "ORDERBOT_DATABASE_ACQUIRE_TIMEOUT_SECS",
        "DB_HOST",
        "DB_PORT",
        "DB_USER",
        "DB_PASSWORD",
        "DB_NAME",
        "ORDERBOT_SERVER_BIND_ADDRESS",
        "ORDERBOT_SERVER_PORT",
        "ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ORDERBOT_SERVER_STATIC_DIR",
        "ORDERBOT_SERVER_TEMPLATES_DIR",
        "ORDERBOT_LOGGING_LEVEL",
        "ORDERBOT_LOGGING_FORMAT",
        "ORDERBOT_LOG_LEVEL",
        "ORDERBOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
