use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use smiles_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
}

const FIELDS: &[ConfigField] = &[
    ConfigField { key_path: "database.url", env_keys: &["SMILES_DATABASE_URL"] },
    ConfigField {
        key_path: "database.max_connections",
        env_keys: &["SMILES_DATABASE_MAX_CONNECTIONS"],
    },
    ConfigField { key_path: "database.timeout_secs", env_keys: &["SMILES_DATABASE_TIMEOUT_SECS"] },
    ConfigField {
        key_path: "datasource.scoped_name",
        env_keys: &["SMILES_DATASOURCE_SCOPED_NAME"],
    },
    ConfigField {
        key_path: "datasource.global_name",
        env_keys: &["SMILES_DATASOURCE_GLOBAL_NAME"],
    },
    ConfigField { key_path: "policy.lead_time_days", env_keys: &["SMILES_POLICY_LEAD_TIME_DAYS"] },
    ConfigField {
        key_path: "policy.minimum_duration_days",
        env_keys: &["SMILES_POLICY_MINIMUM_DURATION_DAYS"],
    },
    ConfigField { key_path: "chat.endpoint", env_keys: &["SMILES_CHAT_ENDPOINT"] },
    ConfigField {
        key_path: "chat.connect_timeout_secs",
        env_keys: &["SMILES_CHAT_CONNECT_TIMEOUT_SECS"],
    },
    ConfigField {
        key_path: "chat.request_timeout_secs",
        env_keys: &["SMILES_CHAT_REQUEST_TIMEOUT_SECS"],
    },
    ConfigField { key_path: "logging.level", env_keys: &["SMILES_LOGGING_LEVEL", "SMILES_LOG_LEVEL"] },
    ConfigField {
        key_path: "logging.format",
        env_keys: &["SMILES_LOGGING_FORMAT", "SMILES_LOG_FORMAT"],
    },
];

pub fn run() -> Result<String, String> {
    let config = AppConfig::load(LoadOptions::default())
        .map_err(|error| format!("config validation failed: {error}"))?;

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    for field in FIELDS {
        lines.push(render_line(
            field.key_path,
            &field_value(&config, field.key_path),
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    let bindings_source =
        field_source("datasource.bindings", &[], config_file_doc.as_ref(), config_file_path.as_deref());
    for (name, url) in config.datasource.effective_bindings(&config.database.url) {
        lines.push(render_line(
            &format!("datasource.bindings.\"{name}\""),
            &url,
            bindings_source.clone(),
        ));
    }

    Ok(lines.join("\n"))
}

fn field_value(config: &AppConfig, key_path: &str) -> String {
    match key_path {
        "database.url" => config.database.url.clone(),
        "database.max_connections" => config.database.max_connections.to_string(),
        "database.timeout_secs" => config.database.timeout_secs.to_string(),
        "datasource.scoped_name" => config.datasource.scoped_name.clone(),
        "datasource.global_name" => config.datasource.global_name.clone(),
        "policy.lead_time_days" => config.policy.lead_time_days.to_string(),
        "policy.minimum_duration_days" => config.policy.minimum_duration_days.to_string(),
        "chat.endpoint" => config.chat.endpoint.clone(),
        "chat.connect_timeout_secs" => config.chat.connect_timeout_secs.to_string(),
        "chat.request_timeout_secs" => config.chat.request_timeout_secs.to_string(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => config.logging.format.as_str().to_string(),
        _ => "<unknown>".to_string(),
    }
}

fn detect_config_path() -> Option<PathBuf> {
    ["smiles.toml", "config/smiles.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
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
