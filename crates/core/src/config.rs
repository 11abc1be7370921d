use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancellation::{CancellationPolicy, DEFAULT_LEAD_TIME_DAYS, DEFAULT_MINIMUM_DURATION_DAYS};

pub const DEFAULT_SCOPED_NAME: &str = "java:comp/env/jdbc/CarBookingDS";
pub const DEFAULT_GLOBAL_NAME: &str = "jdbc/CarBookingDS";
pub const DEFAULT_CHAT_ENDPOINT: &str = "http://localhost:7001/car-booking/api/car-booking/chat";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub datasource: DataSourceConfig,
    pub policy: PolicyConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Logical names consulted when resolving the booking data source, and the
/// database URLs they are bound to.
#[derive(Clone, Debug)]
pub struct DataSourceConfig {
    pub scoped_name: String,
    pub global_name: String,
    pub bindings: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct PolicyConfig {
    pub lead_time_days: u32,
    pub minimum_duration_days: u32,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub chat_endpoint: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` is referenced in the config file but not set")]
    MissingEnvInterpolation { var: String },
    #[error("`${{` in the config file is never closed")]
    UnterminatedInterpolation,
    #[error("{key}=`{value}` is not a valid value")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://milesofsmiles.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            datasource: DataSourceConfig {
                scoped_name: DEFAULT_SCOPED_NAME.to_string(),
                global_name: DEFAULT_GLOBAL_NAME.to_string(),
                bindings: BTreeMap::new(),
            },
            policy: PolicyConfig {
                lead_time_days: DEFAULT_LEAD_TIME_DAYS,
                minimum_duration_days: DEFAULT_MINIMUM_DURATION_DAYS,
            },
            chat: ChatConfig {
                endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
                connect_timeout_secs: 10,
                request_timeout_secs: 60,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        [Self::Compact, Self::Pretty, Self::Json]
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "logging.format `{normalized}` is not one of compact, pretty or json"
                ))
            })
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl DataSourceConfig {
    /// Explicit bindings, or the global name bound to `database_url` when
    /// none are configured.
    pub fn effective_bindings(&self, database_url: &str) -> BTreeMap<String, String> {
        if self.bindings.is_empty() {
            return BTreeMap::from([(self.global_name.clone(), database_url.to_string())]);
        }
        self.bindings.clone()
    }
}

impl PolicyConfig {
    pub fn cancellation_policy(&self) -> CancellationPolicy {
        CancellationPolicy {
            lead_time_days: self.lead_time_days,
            minimum_duration_days: self.minimum_duration_days,
        }
    }
}

impl AppConfig {
    /// Layers defaults, the TOML file, `SMILES_*` variables and explicit
    /// overrides, in that order, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let LoadOptions { config_path, require_file, overrides } = options;
        let mut config = Self::default();

        match locate_config_file(config_path.as_deref()) {
            Some(path) => read_file_layer(&path)?.merge_into(&mut config),
            None if require_file => {
                return Err(ConfigError::MissingConfigFile(
                    config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
                ));
            }
            None => {}
        }

        config.merge_env()?;
        overrides.merge_into(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        env_value("SMILES_DATABASE_URL", &mut self.database.url)?;
        env_value("SMILES_DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;
        env_value("SMILES_DATABASE_TIMEOUT_SECS", &mut self.database.timeout_secs)?;

        env_value("SMILES_DATASOURCE_SCOPED_NAME", &mut self.datasource.scoped_name)?;
        env_value("SMILES_DATASOURCE_GLOBAL_NAME", &mut self.datasource.global_name)?;

        env_value("SMILES_POLICY_LEAD_TIME_DAYS", &mut self.policy.lead_time_days)?;
        env_value("SMILES_POLICY_MINIMUM_DURATION_DAYS", &mut self.policy.minimum_duration_days)?;

        env_value("SMILES_CHAT_ENDPOINT", &mut self.chat.endpoint)?;
        env_value("SMILES_CHAT_CONNECT_TIMEOUT_SECS", &mut self.chat.connect_timeout_secs)?;
        env_value("SMILES_CHAT_REQUEST_TIMEOUT_SECS", &mut self.chat.request_timeout_secs)?;

        // The long names win over the short aliases.
        env_value("SMILES_LOG_LEVEL", &mut self.logging.level)?;
        env_value("SMILES_LOGGING_LEVEL", &mut self.logging.level)?;
        if let Some(raw) = env_var("SMILES_LOGGING_FORMAT").or_else(|| env_var("SMILES_LOG_FORMAT"))
        {
            self.logging.format = raw.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_database()?;
        self.validate_datasource()?;
        self.validate_chat()?;
        self.validate_logging()
    }

    fn validate_database(&self) -> Result<(), ConfigError> {
        let database = &self.database;
        if !is_sqlite_url(&database.url) {
            return Err(invalid(format!(
                "database.url `{}` is not a sqlite URL (sqlite://..., sqlite::... or :memory:)",
                database.url
            )));
        }
        if database.max_connections == 0 {
            return Err(invalid("database.max_connections must be at least 1"));
        }
        within("database.timeout_secs", database.timeout_secs, 300)
    }

    fn validate_datasource(&self) -> Result<(), ConfigError> {
        let scoped = self.datasource.scoped_name.trim();
        let global = self.datasource.global_name.trim();

        if scoped.is_empty() || global.is_empty() {
            return Err(invalid("datasource.scoped_name and datasource.global_name are required"));
        }
        if scoped == global {
            return Err(invalid(format!(
                "datasource.scoped_name and datasource.global_name must differ (both are `{scoped}`)"
            )));
        }

        match self.datasource.bindings.iter().find(|(_, url)| !is_sqlite_url(url)) {
            Some((name, url)) => Err(invalid(format!(
                "datasource.bindings.`{name}` = `{url}` is not a sqlite URL"
            ))),
            None => Ok(()),
        }
    }

    fn validate_chat(&self) -> Result<(), ConfigError> {
        let chat = &self.chat;
        let endpoint = chat.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(invalid(format!("chat.endpoint `{endpoint}` is not an http(s) URL")));
        }
        within("chat.connect_timeout_secs", chat.connect_timeout_secs, 300)?;
        within("chat.request_timeout_secs", chat.request_timeout_secs, 600)
    }

    fn validate_logging(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        let level = self.logging.level.trim().to_ascii_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(invalid(format!("logging.level `{level}` is not one of {}", LEVELS.join(", "))))
        }
    }
}

impl ConfigOverrides {
    fn merge_into(self, config: &mut AppConfig) {
        assign(&mut config.database.url, self.database_url);
        assign(&mut config.logging.level, self.log_level);
        assign(&mut config.chat.endpoint, self.chat_endpoint);
    }
}

const CONFIG_FILE_NAME: &str = "smiles.toml";

fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.is_file().then(|| path.to_path_buf()),
        None => [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
            .into_iter()
            .find(|candidate| candidate.is_file()),
    }
}

fn read_file_layer(path: &Path) -> Result<FileLayer, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let expanded = expand_env_references(&contents)?;
    toml::from_str(&expanded)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${NAME}` in `input` with the value of the environment
/// variable `NAME`.
fn expand_env_references(input: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let name = &after_open[..end];
        let value = env::var(name)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: name.to_string() })?;
        expanded.push_str(&value);
        rest = &after_open[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn is_sqlite_url(url: &str) -> bool {
    let url = url.trim();
    url == ":memory:" || ["sqlite://", "sqlite::"].iter().any(|prefix| url.starts_with(prefix))
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn within(key: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{key} is {value}, expected 1..={max}")))
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Overwrites `target` with the parsed value of `key` when it is set.
fn env_value<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    let Some(raw) = env_var(key) else {
        return Ok(());
    };
    *target = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: raw.clone() })?;
    Ok(())
}

fn assign<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Sections of `smiles.toml`; absent keys leave the current value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileLayer {
    database: DatabaseLayer,
    datasource: DataSourceLayer,
    policy: PolicyLayer,
    chat: ChatLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DatabaseLayer {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DataSourceLayer {
    scoped_name: Option<String>,
    global_name: Option<String>,
    bindings: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PolicyLayer {
    lead_time_days: Option<u32>,
    minimum_duration_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChatLayer {
    endpoint: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl FileLayer {
    fn merge_into(self, config: &mut AppConfig) {
        let Self { database, datasource, policy, chat, logging } = self;

        assign(&mut config.database.url, database.url);
        assign(&mut config.database.max_connections, database.max_connections);
        assign(&mut config.database.timeout_secs, database.timeout_secs);

        assign(&mut config.datasource.scoped_name, datasource.scoped_name);
        assign(&mut config.datasource.global_name, datasource.global_name);
        assign(&mut config.datasource.bindings, datasource.bindings);

        assign(&mut config.policy.lead_time_days, policy.lead_time_days);
        assign(&mut config.policy.minimum_duration_days, policy.minimum_duration_days);

        assign(&mut config.chat.endpoint, chat.endpoint);
        assign(&mut config.chat.connect_timeout_secs, chat.connect_timeout_secs);
        assign(&mut config.chat.request_timeout_secs, chat.request_timeout_secs);

        assign(&mut config.logging.level, logging.level);
        assign(&mut config.logging.format, logging.format);
    }
}
