use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_POOL_CONNECTIONS: u32 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub static_dir: String,
    pub templates_dir: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Storage used for completed orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    Postgres,
    /// Process-local menu and order tables, lost on restart.
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_backend: Option<DatabaseBackend>,
    pub database_host: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_name: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new().into(),
                name: "orderbot".to_string(),
                min_connections: 1,
                max_connections: MAX_POOL_CONNECTIONS,
                acquire_timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                static_dir: "frontend/static".to_string(),
                templates_dir: "frontend/templates".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for DatabaseBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported database backend `{other}` (expected postgres|memory)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl DatabaseConfig {
    /// Connection string with the password masked, for logs and operator output.
    pub fn redacted_url(&self) -> String {
        let password = if self.password.expose_secret().is_empty() { "" } else { ":***" };
        format!("postgres://{}{password}@{}:{}/{}", self.user, self.host, self.port, self.name)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(backend) = database.backend {
                self.database.backend = backend;
            }
            if let Some(host) = database.host {
                self.database.host = host;
            }
            if let Some(port) = database.port {
                self.database.port = port;
            }
            if let Some(user) = database.user {
                self.database.user = user;
            }
            if let Some(password) = database.password {
                self.database.password = secret_value(password);
            }
            if let Some(name) = database.name {
                self.database.name = name;
            }
            if let Some(min_connections) = database.min_connections {
                self.database.min_connections = min_connections;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(acquire_timeout_secs) = database.acquire_timeout_secs {
                self.database.acquire_timeout_secs = acquire_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(static_dir) = server.static_dir {
                self.server.static_dir = static_dir;
            }
            if let Some(templates_dir) = server.templates_dir {
                self.server.templates_dir = templates_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERBOT_DATABASE_BACKEND") {
            self.database.backend = value.parse()?;
        }
        if let Some(value) = read_env_with_alias("ORDERBOT_DATABASE_HOST", "DB_HOST") {
            self.database.host = value;
        }
        if let Some((key, value)) = read_env_keyed("ORDERBOT_DATABASE_PORT", "DB_PORT") {
            self.database.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env_with_alias("ORDERBOT_DATABASE_USER", "DB_USER") {
            self.database.user = value;
        }
        if let Some(value) = read_env_with_alias("ORDERBOT_DATABASE_PASSWORD", "DB_PASSWORD") {
            self.database.password = secret_value(value);
        }
        if let Some(value) = read_env_with_alias("ORDERBOT_DATABASE_NAME", "DB_NAME") {
            self.database.name = value;
        }
        if let Some(value) = read_env("ORDERBOT_DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = parse_u32("ORDERBOT_DATABASE_MIN_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ORDERBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                parse_u64("ORDERBOT_DATABASE_ACQUIRE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_PORT") {
            self.server.port = parse_u16("ORDERBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_STATIC_DIR") {
            self.server.static_dir = value;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_TEMPLATES_DIR") {
            self.server.templates_dir = value;
        }

        if let Some(value) = read_env_with_alias("ORDERBOT_LOGGING_LEVEL", "ORDERBOT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env_with_alias("ORDERBOT_LOGGING_FORMAT", "ORDERBOT_LOG_FORMAT")
        {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.database_backend {
            self.database.backend = backend;
        }
        if let Some(host) = overrides.database_host {
            self.database.host = host;
        }
        if let Some(port) = overrides.database_port {
            self.database.port = port;
        }
        if let Some(user) = overrides.database_user {
            self.database.user = user;
        }
        if let Some(password) = overrides.database_password {
            self.database.password = secret_value(password);
        }
        if let Some(name) = overrides.database_name {
            self.database.name = name;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderbot.toml"), PathBuf::from("config/orderbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if database.backend == DatabaseBackend::Postgres {
        if database.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.host is required (set DB_HOST or ORDERBOT_DATABASE_HOST)".to_string(),
            ));
        }
        if database.user.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.user is required (set DB_USER or ORDERBOT_DATABASE_USER)".to_string(),
            ));
        }
        if database.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.name is required (set DB_NAME or ORDERBOT_DATABASE_NAME)".to_string(),
            ));
        }
        if database.port == 0 {
            return Err(ConfigError::Validation(
                "database.port must be greater than zero".to_string(),
            ));
        }
    }

    if database.min_connections == 0 {
        return Err(ConfigError::Validation(
            "database.min_connections must be greater than zero".to_string(),
        ));
    }

    if database.max_connections > MAX_POOL_CONNECTIONS
        || database.max_connections < database.min_connections
    {
        return Err(ConfigError::Validation(format!(
            "database.max_connections must be in range database.min_connections..={MAX_POOL_CONNECTIONS}"
        )));
    }

    if database.acquire_timeout_secs == 0 || database.acquire_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.acquire_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_env_with_alias(key: &str, alias: &str) -> Option<String> {
    read_env(key).or_else(|| read_env(alias))
}

fn read_env_keyed<'a>(key: &'a str, alias: &'a str) -> Option<(&'a str, String)> {
    read_env(key).map(|value| (key, value)).or_else(|| read_env(alias).map(|value| (alias, value)))
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    backend: Option<DatabaseBackend>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    name: Option<String>,
    min_connections: Option<u32>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    static_dir: Option<String>,
    templates_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
