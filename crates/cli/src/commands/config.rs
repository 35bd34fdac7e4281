use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use eyematch_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let recommendation = &config.recommendation;
    let fields = [
        ("database.url", config.database.url.clone(), "EYEMATCH_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "EYEMATCH_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "EYEMATCH_DATABASE_TIMEOUT_SECS",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "EYEMATCH_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "EYEMATCH_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "EYEMATCH_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "EYEMATCH_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "EYEMATCH_LOGGING_FORMAT"),
        (
            "recommendation.default_limit",
            recommendation.default_limit.to_string(),
            "EYEMATCH_RECOMMENDATION_DEFAULT_LIMIT",
        ),
        (
            "recommendation.feature_weight",
            recommendation.feature_weight.to_string(),
            "EYEMATCH_RECOMMENDATION_FEATURE_WEIGHT",
        ),
        (
            "recommendation.benefit_weight",
            recommendation.benefit_weight.to_string(),
            "EYEMATCH_RECOMMENDATION_BENEFIT_WEIGHT",
        ),
        (
            "recommendation.interconnected_weight",
            recommendation.interconnected_weight.to_string(),
            "EYEMATCH_RECOMMENDATION_INTERCONNECTED_WEIGHT",
        ),
        (
            "recommendation.diversity_threshold",
            recommendation.diversity_threshold.to_string(),
            "EYEMATCH_RECOMMENDATION_DIVERSITY_THRESHOLD",
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        lines.push(render_line(key, &value, source(key, env_key)));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("eyematch.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/eyematch.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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
