use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use shelfrank_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let weights = &config.scoring.weights;
    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        sources.line("database.url", &config.database.url, &["SHELFRANK_DATABASE_URL"]),
        sources.line(
            "database.max_connections",
            &config.database.max_connections.to_string(),
            &["SHELFRANK_DATABASE_MAX_CONNECTIONS"],
        ),
        sources.line(
            "database.timeout_secs",
            &config.database.timeout_secs.to_string(),
            &["SHELFRANK_DATABASE_TIMEOUT_SECS"],
        ),
        sources.line(
            "scoring.min_support",
            &config.scoring.min_support.to_string(),
            &["SHELFRANK_SCORING_MIN_SUPPORT"],
        ),
        sources.line(
            "scoring.min_confidence",
            &config.scoring.min_confidence.to_string(),
            &["SHELFRANK_SCORING_MIN_CONFIDENCE"],
        ),
        sources.line(
            "scoring.collaborative_top_k",
            &config.scoring.collaborative_top_k.to_string(),
            &["SHELFRANK_SCORING_COLLABORATIVE_TOP_K"],
        ),
        sources.line(
            "scoring.trend_window",
            &config.scoring.trend_window.to_string(),
            &["SHELFRANK_SCORING_TREND_WINDOW"],
        ),
        sources.line(
            "scoring.weights.mba",
            &weights.mba.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_MBA"],
        ),
        sources.line(
            "scoring.weights.content",
            &weights.content.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_CONTENT"],
        ),
        sources.line(
            "scoring.weights.collab",
            &weights.collab.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_COLLAB"],
        ),
        sources.line(
            "scoring.weights.season",
            &weights.season.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_SEASON"],
        ),
        sources.line(
            "scoring.weights.trend",
            &weights.trend.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_TREND"],
        ),
        sources.line(
            "scoring.weights.forecast",
            &weights.forecast.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_FORECAST"],
        ),
        sources.line(
            "scoring.weights.stock",
            &weights.stock.to_string(),
            &["SHELFRANK_SCORING_WEIGHTS_STOCK"],
        ),
        sources.line(
            "logging.level",
            &config.logging.level,
            &["SHELFRANK_LOGGING_LEVEL", "SHELFRANK_LOG_LEVEL"],
        ),
        sources.line(
            "logging.format",
            &format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["SHELFRANK_LOGGING_FORMAT", "SHELFRANK_LOG_FORMAT"],
        ),
    ];

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("shelfrank.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/shelfrank.toml");
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

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        render_line(key_path, value, self.field_source(key_path, env_keys))
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
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
