//! Configuration management for the medallion pipeline core.
//!
//! Configuration is assembled once at process start from built-in defaults,
//! an optional YAML file and `MEDALLION__*` environment variables, then passed
//! explicitly into each component.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MedallionError, Result};

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "MEDALLION";
/// Separator between the prefix and nested keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Main configuration for the medallion tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedallionConfig {
    /// Outbound API throttling
    #[serde(default)]
    pub rate_limiting: RateLimiterConfig,

    /// Storage event routing
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Floor delay between requests, in seconds
    #[serde(default = "default_minimum_delay")]
    pub minimum_delay_secs: f64,

    /// Ceiling delay between requests, in seconds
    #[serde(default = "default_maximum_delay")]
    pub maximum_delay_secs: f64,

    /// Multiplier applied by explicit backoff requests
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Multiplier applied to the delay after a fast successful response
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Responses faster than this many seconds count as fast
    #[serde(default = "default_fast_response")]
    pub fast_response_secs: f64,

    /// Consecutive errors after which callers should give up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            minimum_delay_secs: default_minimum_delay(),
            maximum_delay_secs: default_maximum_delay(),
            backoff_factor: default_backoff_factor(),
            decay_factor: default_decay_factor(),
            fast_response_secs: default_fast_response(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_minimum_delay() -> f64 {
    1.0
}

fn default_maximum_delay() -> f64 {
    60.0
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_decay_factor() -> f64 {
    0.9
}

fn default_fast_response() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    5
}

impl RateLimiterConfig {
    /// Check the numeric bounds the limiter relies on.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.minimum_delay_secs,
            self.maximum_delay_secs,
            self.backoff_factor,
            self.decay_factor,
            self.fast_response_secs,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(MedallionError::Config(
                "rate limiting values must be finite numbers".to_string(),
            ));
        }
        if self.minimum_delay_secs < 0.0 {
            return Err(MedallionError::Config(format!(
                "minimum_delay_secs must not be negative (got {})",
                self.minimum_delay_secs
            )));
        }
        if self.maximum_delay_secs < self.minimum_delay_secs {
            return Err(MedallionError::Config(format!(
                "maximum_delay_secs ({}) is below minimum_delay_secs ({})",
                self.maximum_delay_secs, self.minimum_delay_secs
            )));
        }
        if self.backoff_factor <= 1.0 {
            return Err(MedallionError::Config(format!(
                "backoff_factor must be greater than 1.0 (got {})",
                self.backoff_factor
            )));
        }
        if self.decay_factor <= 0.0 || self.decay_factor > 1.0 {
            return Err(MedallionError::Config(format!(
                "decay_factor must be in (0, 1] (got {})",
                self.decay_factor
            )));
        }
        if self.fast_response_secs < 0.0 {
            return Err(MedallionError::Config(format!(
                "fast_response_secs must not be negative (got {})",
                self.fast_response_secs
            )));
        }
        for (name, secs) in [
            ("minimum_delay_secs", self.minimum_delay_secs),
            ("maximum_delay_secs", self.maximum_delay_secs),
            ("fast_response_secs", self.fast_response_secs),
        ] {
            Duration::try_from_secs_f64(secs).map_err(|e| {
                MedallionError::Config(format!("{name} is not a valid duration ({secs}): {e}"))
            })?;
        }
        Ok(())
    }

    pub fn minimum_delay(&self) -> Duration {
        Duration::from_secs_f64(self.minimum_delay_secs)
    }

    pub fn maximum_delay(&self) -> Duration {
        Duration::from_secs_f64(self.maximum_delay_secs)
    }

    pub fn fast_response(&self) -> Duration {
        Duration::from_secs_f64(self.fast_response_secs)
    }
}

/// Storage event routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Entity types that may trigger a job; empty allows every entity
    #[serde(default)]
    pub entity_types: Vec<String>,

    /// Only readiness markers trigger jobs
    #[serde(default)]
    pub require_marker: bool,

    /// Notification event names must start with this prefix
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            entity_types: Vec::new(),
            require_marker: false,
            event_prefix: default_event_prefix(),
        }
    }
}

fn default_event_prefix() -> String {
    "ObjectCreated:".to_string()
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per line
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl MedallionConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: MedallionConfig = serde_yaml::from_str(yaml)
            .map_err(|e| MedallionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then the optional file, then `MEDALLION__*` environment
    /// variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`MedallionConfig::load`], reading overrides from `env` instead of
    /// the process environment when it is given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("routing.entity_types")
                .source(env),
        );

        let config: MedallionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.validate()
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| MedallionError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MedallionConfig::default();
        assert_eq!(config.rate_limiting.minimum_delay(), Duration::from_secs(1));
        assert_eq!(config.rate_limiting.maximum_delay(), Duration::from_secs(60));
        assert_eq!(config.rate_limiting.max_retries, 5);
        assert!(config.routing.entity_types.is_empty());
        assert_eq!(config.routing.event_prefix, "ObjectCreated:");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
rate_limiting:
  minimum_delay_secs: 0.6
  max_retries: 3
routing:
  entity_types: [player-stats, team_stats]
"#;
        let config = MedallionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limiting.minimum_delay_secs, 0.6);
        assert_eq!(config.rate_limiting.maximum_delay_secs, 60.0);
        assert_eq!(config.rate_limiting.max_retries, 3);
        assert_eq!(config.routing.entity_types, vec!["player-stats", "team_stats"]);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = RateLimiterConfig {
            minimum_delay_secs: 10.0,
            maximum_delay_secs: 5.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MedallionError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_factors() {
        let config = RateLimiterConfig {
            backoff_factor: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RateLimiterConfig {
            decay_factor: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RateLimiterConfig {
            minimum_delay_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_durations() {
        let config = RateLimiterConfig {
            maximum_delay_secs: 1e20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MedallionError::Config(_))));

        let config = RateLimiterConfig {
            fast_response_secs: 1e30,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let result = MedallionConfig::from_yaml("rate_limiting:\n  maximum_delay_secs: 1.0e20\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_file_with_env_override() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "rate_limiting:\n  minimum_delay_secs: 2.0\n  maximum_delay_secs: 30.0\nlogging:\n  level: debug"
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(
            "MEDALLION__RATE_LIMITING__MAXIMUM_DELAY_SECS".to_string(),
            "45".to_string(),
        );
        env.insert("MEDALLION__LOGGING__JSON".to_string(), "true".to_string());
        env.insert(
            "MEDALLION__ROUTING__ENTITY_TYPES".to_string(),
            "box_scores,team_stats".to_string(),
        );

        let config = MedallionConfig::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(config.rate_limiting.minimum_delay_secs, 2.0);
        assert_eq!(config.rate_limiting.maximum_delay_secs, 45.0);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.routing.entity_types, vec!["box_scores", "team_stats"]);
    }

    #[test]
    fn test_load_without_sources_uses_defaults() {
        let config = MedallionConfig::load_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(config.rate_limiting.backoff_factor, 2.0);
        assert!(!config.routing.require_marker);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = MedallionConfig::load_with_env(
            Some(Path::new("/nonexistent/medallion.yaml")),
            Some(HashMap::new()),
        );
        assert!(matches!(result, Err(MedallionError::Config(_))));
    }

    #[test]
    fn test_yaml_round_trip_of_effective_config() {
        let yaml = MedallionConfig::default().to_yaml().unwrap();
        let parsed = MedallionConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.routing.event_prefix, "ObjectCreated:");
    }
}
