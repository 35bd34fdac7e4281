use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommend::{
    DiversityPolicy, RecommendationEngine, ScoreCalculator, ScoringWeights, DEFAULT_LIMIT,
    DEFAULT_WEIGHTS, DIVERSITY_MIN_CANDIDATES,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub feature_weight: f64,
    pub benefit_weight: f64,
    pub interconnected_weight: f64,
    pub diversity_threshold: usize,
}

impl RecommendationConfig {
    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights {
            feature: self.feature_weight,
            benefit: self.benefit_weight,
            interconnected: self.interconnected_weight,
        }
    }

    pub fn diversity_policy(&self) -> DiversityPolicy {
        DiversityPolicy::default().with_min_candidates(self.diversity_threshold)
    }

    /// Engine wired with the configured blend weights and diversity threshold.
    pub fn engine(&self) -> RecommendationEngine {
        RecommendationEngine::new(
            ScoreCalculator::with_weights(self.scoring_weights()),
            self.diversity_policy(),
        )
    }
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
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub default_limit: Option<usize>,
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
                url: "sqlite://eyematch.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            recommendation: RecommendationConfig {
                default_limit: DEFAULT_LIMIT,
                feature_weight: DEFAULT_WEIGHTS.feature,
                benefit_weight: DEFAULT_WEIGHTS.benefit,
                interconnected_weight: DEFAULT_WEIGHTS.interconnected,
                diversity_threshold: DIVERSITY_MIN_CANDIDATES,
            },
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("eyematch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
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
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(default_limit) = recommendation.default_limit {
                self.recommendation.default_limit = default_limit;
            }
            if let Some(feature_weight) = recommendation.feature_weight {
                self.recommendation.feature_weight = feature_weight;
            }
            if let Some(benefit_weight) = recommendation.benefit_weight {
                self.recommendation.benefit_weight = benefit_weight;
            }
            if let Some(interconnected_weight) = recommendation.interconnected_weight {
                self.recommendation.interconnected_weight = interconnected_weight;
            }
            if let Some(diversity_threshold) = recommendation.diversity_threshold {
                self.recommendation.diversity_threshold = diversity_threshold;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("EYEMATCH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("EYEMATCH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("EYEMATCH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("EYEMATCH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("EYEMATCH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("EYEMATCH_SERVER_PORT") {
            self.server.port = parse_env("EYEMATCH_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("EYEMATCH_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("EYEMATCH_LOGGING_LEVEL").or_else(|| read_env("EYEMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("EYEMATCH_LOGGING_FORMAT").or_else(|| read_env("EYEMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("EYEMATCH_RECOMMENDATION_DEFAULT_LIMIT") {
            self.recommendation.default_limit =
                parse_env("EYEMATCH_RECOMMENDATION_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_RECOMMENDATION_FEATURE_WEIGHT") {
            self.recommendation.feature_weight =
                parse_env("EYEMATCH_RECOMMENDATION_FEATURE_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_RECOMMENDATION_BENEFIT_WEIGHT") {
            self.recommendation.benefit_weight =
                parse_env("EYEMATCH_RECOMMENDATION_BENEFIT_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_RECOMMENDATION_INTERCONNECTED_WEIGHT") {
            self.recommendation.interconnected_weight =
                parse_env("EYEMATCH_RECOMMENDATION_INTERCONNECTED_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("EYEMATCH_RECOMMENDATION_DIVERSITY_THRESHOLD") {
            self.recommendation.diversity_threshold =
                parse_env("EYEMATCH_RECOMMENDATION_DIVERSITY_THRESHOLD", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(default_limit) = overrides.default_limit {
            self.recommendation.default_limit = default_limit;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        validate_recommendation(&self.recommendation)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("eyematch.toml"), PathBuf::from("config/eyematch.toml")]
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
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
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

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.default_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation.default_limit must be greater than zero".to_string(),
        ));
    }

    let weights = [
        ("recommendation.feature_weight", recommendation.feature_weight),
        ("recommendation.benefit_weight", recommendation.benefit_weight),
        ("recommendation.interconnected_weight", recommendation.interconnected_weight),
    ];
    for (key, weight) in weights {
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    recommendation: Option<RecommendationPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    default_limit: Option<usize>,
    feature_weight: Option<f64>,
    benefit_weight: Option<f64>,
    interconnected_weight: Option<f64>,
    diversity_threshold: Option<usize>,
}
