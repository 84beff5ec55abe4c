use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommend::{BlendWeights, ColdStartPolicy};

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub recommendation: RecommendationConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationConfig {
    pub collaborative_weight: f64,
    pub content_weight: f64,
    pub default_count: usize,
    pub max_count: usize,
    pub cold_start: ColdStartPolicy,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub default_top_products_limit: usize,
    pub max_top_products_limit: usize,
}

#[derive(Clone, Debug, PartialEq)]
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
    pub collaborative_weight: Option<f64>,
    pub content_weight: Option<f64>,
    pub default_count: Option<usize>,
    pub cold_start: Option<ColdStartPolicy>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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

impl Default for EngineConfig {
    fn default() -> Self {
        let weights = crate::recommend::DEFAULT_WEIGHTS;
        Self {
            recommendation: RecommendationConfig {
                collaborative_weight: weights.collaborative,
                content_weight: weights.content,
                default_count: crate::recommend::DEFAULT_RECOMMENDATION_COUNT,
                max_count: 100,
                cold_start: ColdStartPolicy::IdentifierOrder,
            },
            analytics: AnalyticsConfig {
                default_top_products_limit: crate::analytics::DEFAULT_TOP_PRODUCTS_LIMIT,
                max_top_products_limit: 1000,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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

impl RecommendationConfig {
    pub fn weights(&self) -> BlendWeights {
        BlendWeights { collaborative: self.collaborative_weight, content: self.content_weight }
    }
}

impl EngineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("storefront.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(recommendation) = patch.recommendation {
            if let Some(collaborative_weight) = recommendation.collaborative_weight {
                self.recommendation.collaborative_weight = collaborative_weight;
            }
            if let Some(content_weight) = recommendation.content_weight {
                self.recommendation.content_weight = content_weight;
            }
            if let Some(default_count) = recommendation.default_count {
                self.recommendation.default_count = default_count;
            }
            if let Some(max_count) = recommendation.max_count {
                self.recommendation.max_count = max_count;
            }
            if let Some(cold_start) = recommendation.cold_start {
                self.recommendation.cold_start = cold_start;
            }
        }

        if let Some(analytics) = patch.analytics {
            if let Some(limit) = analytics.default_top_products_limit {
                self.analytics.default_top_products_limit = limit;
            }
            if let Some(limit) = analytics.max_top_products_limit {
                self.analytics.max_top_products_limit = limit;
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
        const COLLABORATIVE_WEIGHT: &str = "STOREFRONT_RECOMMENDATION_COLLABORATIVE_WEIGHT";
        const CONTENT_WEIGHT: &str = "STOREFRONT_RECOMMENDATION_CONTENT_WEIGHT";
        const DEFAULT_COUNT: &str = "STOREFRONT_RECOMMENDATION_DEFAULT_COUNT";
        const MAX_COUNT: &str = "STOREFRONT_RECOMMENDATION_MAX_COUNT";
        const COLD_START: &str = "STOREFRONT_RECOMMENDATION_COLD_START";
        const DEFAULT_TOP: &str = "STOREFRONT_ANALYTICS_DEFAULT_TOP_PRODUCTS_LIMIT";
        const MAX_TOP: &str = "STOREFRONT_ANALYTICS_MAX_TOP_PRODUCTS_LIMIT";

        if let Some(value) = read_env(COLLABORATIVE_WEIGHT) {
            self.recommendation.collaborative_weight = parse_f64(COLLABORATIVE_WEIGHT, &value)?;
        }
        if let Some(value) = read_env(CONTENT_WEIGHT) {
            self.recommendation.content_weight = parse_f64(CONTENT_WEIGHT, &value)?;
        }
        if let Some(value) = read_env(DEFAULT_COUNT) {
            self.recommendation.default_count = parse_usize(DEFAULT_COUNT, &value)?;
        }
        if let Some(value) = read_env(MAX_COUNT) {
            self.recommendation.max_count = parse_usize(MAX_COUNT, &value)?;
        }
        if let Some(value) = read_env(COLD_START) {
            self.recommendation.cold_start = value.parse::<ColdStartPolicy>().map_err(|_| {
                ConfigError::InvalidEnvOverride { key: COLD_START.to_string(), value }
            })?;
        }

        if let Some(value) = read_env(DEFAULT_TOP) {
            self.analytics.default_top_products_limit = parse_usize(DEFAULT_TOP, &value)?;
        }
        if let Some(value) = read_env(MAX_TOP) {
            self.analytics.max_top_products_limit = parse_usize(MAX_TOP, &value)?;
        }

        let log_level =
            read_env("STOREFRONT_LOGGING_LEVEL").or_else(|| read_env("STOREFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STOREFRONT_LOGGING_FORMAT").or_else(|| read_env("STOREFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(collaborative_weight) = overrides.collaborative_weight {
            self.recommendation.collaborative_weight = collaborative_weight;
        }
        if let Some(content_weight) = overrides.content_weight {
            self.recommendation.content_weight = content_weight;
        }
        if let Some(default_count) = overrides.default_count {
            self.recommendation.default_count = default_count;
        }
        if let Some(cold_start) = overrides.cold_start {
            self.recommendation.cold_start = cold_start;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_recommendation(&self.recommendation)?;
        validate_analytics(&self.analytics)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
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

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    recommendation.weights().validate().map_err(|error| {
        ConfigError::Validation(format!("recommendation weights are invalid: {error}"))
    })?;

    if recommendation.max_count == 0 {
        return Err(ConfigError::Validation(
            "recommendation.max_count must be greater than zero".to_string(),
        ));
    }
    if recommendation.default_count == 0
        || recommendation.default_count > recommendation.max_count
    {
        return Err(ConfigError::Validation(format!(
            "recommendation.default_count must be in range 1..={}",
            recommendation.max_count
        )));
    }

    Ok(())
}

fn validate_analytics(analytics: &AnalyticsConfig) -> Result<(), ConfigError> {
    if analytics.max_top_products_limit == 0 {
        return Err(ConfigError::Validation(
            "analytics.max_top_products_limit must be greater than zero".to_string(),
        ));
    }
    if analytics.default_top_products_limit == 0
        || analytics.default_top_products_limit > analytics.max_top_products_limit
    {
        return Err(ConfigError::Validation(format!(
            "analytics.default_top_products_limit must be in range 1..={}",
            analytics.max_top_products_limit
        )));
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
    recommendation: Option<RecommendationPatch>,
    analytics: Option<AnalyticsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    collaborative_weight: Option<f64>,
    content_weight: Option<f64>,
    default_count: Option<usize>,
    max_count: Option<usize>,
    cold_start: Option<ColdStartPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyticsPatch {
    default_top_products_limit: Option<usize>,
    max_top_products_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
