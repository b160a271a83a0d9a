use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderbot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(
        key_path: &'static str,
        value: impl ToString,
        env_keys: &'static [&'static str],
    ) -> Self {
        Self { key_path, value: value.to_string(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let database = &config.database;
    let password =
        if database.password.expose_secret().is_empty() { "<unset>" } else { "<redacted>" };

    vec![
        Field::new(
            "database.backend",
            format!("{:?}", database.backend),
            &["ORDERBOT_DATABASE_BACKEND"],
        ),
        Field::new("database.host", &database.host, &["ORDERBOT_DATABASE_HOST", "DB_HOST"]),
        Field::new("database.port", database.port, &["ORDERBOT_DATABASE_PORT", "DB_PORT"]),
        Field::new("database.user", &database.user, &["ORDERBOT_DATABASE_USER", "DB_USER"]),
        Field::new(
            "database.password",
            password,
            &["ORDERBOT_DATABASE_PASSWORD", "DB_PASSWORD"],
        ),
        Field::new("database.name", &database.name, &["ORDERBOT_DATABASE_NAME", "DB_NAME"]),
        Field::new(
            "database.min_connections",
            database.min_connections,
            &["ORDERBOT_DATABASE_MIN_CONNECTIONS"],
        ),
        Field::new(
            "database.max_connections",
            database.max_connections,
            &["ORDERBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.acquire_timeout_secs",
            database.acquire_timeout_secs,
            &["ORDERBOT_DATABASE_ACQUIRE_TIMEOUT_SECS"],
        ),
        Field::new(
            "server.bind_address",
            &config.server.bind_address,
            &["ORDERBOT_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port, &["ORDERBOT_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new("server.static_dir", &config.server.static_dir, &["ORDERBOT_SERVER_STATIC_DIR"]),
        Field::new(
            "server.templates_dir",
            &config.server.templates_dir,
            &["ORDERBOT_SERVER_TEMPLATES_DIR"],
        ),
        Field::new(
            "logging.level",
            &config.logging.level,
            &["ORDERBOT_LOGGING_LEVEL", "ORDERBOT_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ORDERBOT_LOGGING_FORMAT", "ORDERBOT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("orderbot.toml"), PathBuf::from("config/orderbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: Value = "[database]\nhost = \"db\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "database.host"));
        assert!(!contains_path(&doc, "database.port"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn unset_field_without_file_is_default() {
        let source = field_source(
            "server.templates_dir",
            &["ORDERBOT_TEST_UNSET_TEMPLATES_DIR"],
            None,
            None,
        );
        assert_eq!(source, "default");
    }
}
