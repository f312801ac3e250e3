//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `condop.toml` in the working directory. Every field has a
//! sensible default so the file is optional; without `[[scenes]]` the demo
//! catalogue is used. Environment variables take precedence over file values.

use std::collections::HashSet;

use serde::Deserialize;

use condop_domain::condition::Condition;
use condop_domain::error::ValidationError;
use condop_domain::operation::OpSpec;
use condop_domain::scene::{EvaluationMode, HandlerConfig, SceneConfig};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Scene catalogue.
    pub scenes: Vec<SceneConfig>,
}

/// Scheduler settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Scene started at boot; the first catalogue entry when unset.
    pub default_scene: Option<String>,
    /// Capacity of the dispatch event bus.
    pub event_capacity: usize,
    /// Consecutive evaluation failures before a handler is reported.
    pub failure_warn_threshold: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `condop.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("condop.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Parse a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CONDOP_SCENE") {
            self.scheduler.default_scene = Some(val);
        }
        if let Ok(val) = std::env::var("CONDOP_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check the catalogue and scheduler settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the catalogue is empty, a
    /// scene is invalid, two scenes share a name, the default scene does not
    /// exist, or the event capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "event_capacity must be non-zero".to_string(),
            ));
        }
        if self.scenes.is_empty() {
            return Err(ConfigError::Validation(
                "at least one scene is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for scene in &self.scenes {
            scene.validate().map_err(|err| {
                ConfigError::Validation(format!("scene `{}`: {err}", scene.name))
            })?;
            if !seen.insert(scene.name.as_str()) {
                return Err(ValidationError::DuplicateScene(scene.name.clone()).into());
            }
        }
        self.default_scene()?;
        Ok(())
    }

    /// The scene to start at boot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the configured default scene is
    /// not in the catalogue, or the catalogue is empty.
    pub fn default_scene(&self) -> Result<&SceneConfig, ConfigError> {
        match &self.scheduler.default_scene {
            Some(name) => self.scene(name).ok_or_else(|| {
                ConfigError::Validation(format!("default scene `{name}` is not in the catalogue"))
            }),
            None => self
                .scenes
                .first()
                .ok_or_else(|| ConfigError::Validation("the scene catalogue is empty".to_string())),
        }
    }

    /// Look a scene up by name.
    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&SceneConfig> {
        self.scenes.iter().find(|s| s.name == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
            scenes: demo_scenes(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_scene: None,
            event_capacity: 256,
            failure_warn_threshold: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "condopd=info,condop_app=info".to_string(),
        }
    }
}

fn press(key: &str, hold_ms: u64) -> OpSpec {
    OpSpec::Press {
        key: key.to_string(),
        hold_ms,
    }
}

/// Catalogue used when the configuration file names no scenes.
///
/// Reacts to the states fed by the daemon's demo perception loop.
#[must_use]
pub fn demo_scenes() -> Vec<SceneConfig> {
    let combat = SceneConfig {
        name: "combat".to_string(),
        interval_seconds: 0.05,
        evaluation: EvaluationMode::FirstMatch,
        handlers: vec![
            HandlerConfig {
                name: "dodge".to_string(),
                condition: Condition::Seen {
                    state: "enemy_flash".to_string(),
                    within_seconds: 0.2,
                },
                debounce_ticks: 1,
                cooldown_seconds: 0.5,
                operations: vec![press("shift", 80)],
            },
            HandlerConfig {
                name: "finisher".to_string(),
                condition: Condition::All {
                    of: vec![
                        Condition::ValueBelow {
                            state: "boss_hp".to_string(),
                            max: 20,
                        },
                        Condition::ValueAtLeast {
                            state: "energy".to_string(),
                            min: 3,
                        },
                    ],
                },
                debounce_ticks: 2,
                cooldown_seconds: 3.0,
                operations: vec![press("q", 0), OpSpec::Wait { millis: 150 }, press("e", 0)],
            },
            HandlerConfig {
                name: "attack".to_string(),
                condition: Condition::Always,
                debounce_ticks: 1,
                cooldown_seconds: 0.3,
                operations: vec![press("j", 0)],
            },
        ],
    };
    let explore = SceneConfig {
        name: "explore".to_string(),
        interval_seconds: 0.2,
        evaluation: EvaluationMode::FirstMatch,
        handlers: vec![HandlerConfig {
            name: "run".to_string(),
            condition: Condition::Not {
                condition: Box::new(Condition::Seen {
                    state: "enemy_flash".to_string(),
                    within_seconds: 2.0,
                }),
            },
            debounce_ticks: 1,
            cooldown_seconds: 0.0,
            operations: vec![OpSpec::Hold {
                key: "w".to_string(),
            }],
        }],
    };
    vec![combat, explore]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduler.event_capacity, 256);
        assert_eq!(config.scheduler.failure_warn_threshold, 10);
        assert!(config.scheduler.default_scene.is_none());
        assert_eq!(config.logging.filter, "condopd=info,condop_app=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.scheduler.event_capacity, 256);
        assert_eq!(config.scenes.len(), 2);
    }

    #[test]
    fn should_start_first_scene_by_default() {
        let config = Config::default();
        assert_eq!(config.default_scene().unwrap().name, "combat");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = r#"
            [scheduler]
            default_scene = "menu"
            event_capacity = 64
            failure_warn_threshold = 3

            [logging]
            filter = "debug"

            [[scenes]]
            name = "menu"
            interval_seconds = 0.5
            evaluation = "evaluate_all"

            [[scenes.handlers]]
            name = "confirm"
            debounce_ticks = 2
            cooldown_seconds = 1.5
            condition = { type = "value_at_least", state = "dialog", min = 1 }
            operations = [
                { type = "press", key = "enter" },
                { type = "wait", millis = 200 },
            ]

            [[scenes.handlers]]
            name = "idle"
            operations = [{ type = "hold", key = "w" }]
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.scheduler.event_capacity, 64);
        assert_eq!(config.scheduler.failure_warn_threshold, 3);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.scenes.len(), 1);

        let menu = config.default_scene().unwrap();
        assert_eq!(menu.evaluation, EvaluationMode::EvaluateAll);
        assert_eq!(menu.handlers[0].debounce_ticks, 2);
        assert_eq!(menu.handlers[0].operations[0], press("enter", 0));
        assert_eq!(menu.handlers[1].condition, Condition::Always);
        assert_eq!(menu.handlers[1].debounce_ticks, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.scheduler.event_capacity, 256);
    }

    #[test]
    fn should_reject_unknown_default_scene() {
        let mut config = Config::default();
        config.scheduler.default_scene = Some("boss".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("boss")));
    }

    #[test]
    fn should_reject_duplicate_scene_names() {
        let mut config = Config::default();
        let copy = config.scenes[0].clone();
        config.scenes.push(copy);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("combat")
        ));
    }

    #[test]
    fn should_reject_invalid_scene() {
        let mut config = Config::default();
        config.scenes[1].interval_seconds = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("explore")
        ));
    }

    #[test]
    fn should_reject_zero_event_capacity() {
        let mut config = Config::default();
        config.scheduler.event_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_catalogue() {
        let config = Config::parse("scenes = []").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        assert!(matches!(
            Config::parse("invalid {{{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn should_look_up_scene_by_name() {
        let config = Config::default();
        assert!(config.scene("explore").is_some());
        assert!(config.scene("missing").is_none());
    }
}
