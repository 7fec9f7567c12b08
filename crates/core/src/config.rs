use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::DomainError;
use crate::recommend::ScoringWeights;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Tunables for one recommendation computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Inclusive support floor for frequent itemsets, in (0, 1].
    pub min_support: f64,
    /// Inclusive confidence floor for rules, in (0, 1].
    pub min_confidence: f64,
    /// Neighbours averaged by the collaborative scorer.
    pub collaborative_top_k: usize,
    /// Months considered by the trend signal, newest included.
    pub trend_window: usize,
    pub weights: ScoringWeights,
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
    pub log_format: Option<LogFormat>,
    pub min_support: Option<f64>,
    pub min_confidence: Option<f64>,
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
                url: "sqlite://shelfrank.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            scoring: ScoringConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.1,
            collaborative_top_k: crate::recommend::collaborative::DEFAULT_TOP_K,
            trend_window: crate::recommend::temporal::DEFAULT_TREND_WINDOW,
            weights: ScoringWeights::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [("min_support", self.min_support), ("min_confidence", self.min_confidence)]
        {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DomainError::InvariantViolation(format!(
                    "scoring.{name} must be in range (0, 1], got {value}"
                )));
            }
        }

        if self.collaborative_top_k == 0 {
            return Err(DomainError::InvariantViolation(
                "scoring.collaborative_top_k must be greater than zero".to_string(),
            ));
        }

        if self.trend_window == 0 {
            return Err(DomainError::InvariantViolation(
                "scoring.trend_window must be greater than zero".to_string(),
            ));
        }

        for (name, weight) in self.weights.as_pairs() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DomainError::InvariantViolation(format!(
                    "scoring.weights.{name} must be a non-negative number, got {weight}"
                )));
            }
        }

        Ok(())
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("shelfrank.toml"));
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

        if let Some(scoring) = patch.scoring {
            if let Some(min_support) = scoring.min_support {
                self.scoring.min_support = min_support;
            }
            if let Some(min_confidence) = scoring.min_confidence {
                self.scoring.min_confidence = min_confidence;
            }
            if let Some(top_k) = scoring.collaborative_top_k {
                self.scoring.collaborative_top_k = top_k;
            }
            if let Some(trend_window) = scoring.trend_window {
                self.scoring.trend_window = trend_window;
            }
            if let Some(weights) = scoring.weights {
                let target = &mut self.scoring.weights;
                for (slot, value) in [
                    (&mut target.mba, weights.mba),
                    (&mut target.content, weights.content),
                    (&mut target.collab, weights.collab),
                    (&mut target.season, weights.season),
                    (&mut target.trend, weights.trend),
                    (&mut target.forecast, weights.forecast),
                    (&mut target.stock, weights.stock),
                ] {
                    if let Some(value) = value {
                        *slot = value;
                    }
                }
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
        if let Some(value) = read_env("SHELFRANK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHELFRANK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHELFRANK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHELFRANK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHELFRANK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHELFRANK_SCORING_MIN_SUPPORT") {
            self.scoring.min_support = parse_f64("SHELFRANK_SCORING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("SHELFRANK_SCORING_MIN_CONFIDENCE") {
            self.scoring.min_confidence = parse_f64("SHELFRANK_SCORING_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("SHELFRANK_SCORING_COLLABORATIVE_TOP_K") {
            self.scoring.collaborative_top_k =
                parse_usize("SHELFRANK_SCORING_COLLABORATIVE_TOP_K", &value)?;
        }
        if let Some(value) = read_env("SHELFRANK_SCORING_TREND_WINDOW") {
            self.scoring.trend_window = parse_usize("SHELFRANK_SCORING_TREND_WINDOW", &value)?;
        }

        let weights = &mut self.scoring.weights;
        for (key, slot) in [
            ("SHELFRANK_SCORING_WEIGHTS_MBA", &mut weights.mba),
            ("SHELFRANK_SCORING_WEIGHTS_CONTENT", &mut weights.content),
            ("SHELFRANK_SCORING_WEIGHTS_COLLAB", &mut weights.collab),
            ("SHELFRANK_SCORING_WEIGHTS_SEASON", &mut weights.season),
            ("SHELFRANK_SCORING_WEIGHTS_TREND", &mut weights.trend),
            ("SHELFRANK_SCORING_WEIGHTS_FORECAST", &mut weights.forecast),
            ("SHELFRANK_SCORING_WEIGHTS_STOCK", &mut weights.stock),
        ] {
            if let Some(value) = read_env(key) {
                *slot = parse_f64(key, &value)?;
            }
        }

        let log_level =
            read_env("SHELFRANK_LOGGING_LEVEL").or_else(|| read_env("SHELFRANK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHELFRANK_LOGGING_FORMAT").or_else(|| read_env("SHELFRANK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
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
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(min_support) = overrides.min_support {
            self.scoring.min_support = min_support;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.scoring.min_confidence = min_confidence;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_scoring(&self.scoring)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shelfrank.toml"), PathBuf::from("config/shelfrank.toml")]
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

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    scoring.validate().map_err(|error| match error {
        DomainError::InvariantViolation(message) => ConfigError::Validation(message),
    })
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    scoring: Option<ScoringPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    min_support: Option<f64>,
    min_confidence: Option<f64>,
    collaborative_top_k: Option<usize>,
    trend_window: Option<usize>,
    weights: Option<WeightsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WeightsPatch {
    mba: Option<f64>,
    content: Option<f64>,
    collab: Option<f64>,
    season: Option<f64>,
    trend: Option<f64>,
    forecast: Option<f64>,
    stock: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
