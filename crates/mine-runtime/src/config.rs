//! Engine tuning loaded from YAML.

use mine_planets::PlacementRules;
use persistence::SlotKeys;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// Timing and layout knobs of a session. Every field has a default, so an
/// empty document is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds of game time per accrual tick.
    pub tick_interval_secs: f64,
    pub autosave_interval_secs: f64,
    /// Most accrual ticks run by one `advance`; the rest are dropped.
    pub max_catch_up_ticks: u32,
    pub activation_delay_secs: f64,
    pub transition_secs: f64,
    pub placement: PlacementRules,
    pub rng_seed: u64,
    pub slots: SlotKeys,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1.0,
            autosave_interval_secs: 30.0,
            max_catch_up_ticks: 10,
            activation_delay_secs: 1.5,
            transition_secs: 2.0,
            placement: PlacementRules::default(),
            rng_seed: 42,
            slots: SlotKeys::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: EngineConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };
        positive("tick_interval_secs", self.tick_interval_secs)?;
        positive("autosave_interval_secs", self.autosave_interval_secs)?;
        for (name, v) in [
            ("activation_delay_secs", self.activation_delay_secs),
            ("transition_secs", self.transition_secs),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 0, got {v}")));
            }
        }
        if self.max_catch_up_ticks == 0 {
            return Err(ConfigError::Invalid("max_catch_up_ticks must be >= 1".into()));
        }
        if self.slots.primary == self.slots.backup {
            return Err(ConfigError::Invalid("primary and backup slots must differ".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = EngineConfig::from_yaml_str("tick_interval_secs: 0.5\nrng_seed: 7\n").unwrap();
        assert_eq!(cfg.tick_interval_secs, 0.5);
        assert_eq!(cfg.rng_seed, 7);
        assert_eq!(cfg.autosave_interval_secs, 30.0);
        assert_eq!(cfg.placement, PlacementRules::default());
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn nested_sections_parse() {
        let yaml = "slots:\n  primary: a\n  backup: b\nplacement:\n  clearance: 30\n";
        let cfg = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.slots.primary, "a");
        assert_eq!(cfg.placement.clearance, 30.0);
    }

    #[test]
    fn nonsense_is_rejected() {
        assert!(EngineConfig::from_yaml_str("tick_interval_secs: 0").is_err());
        assert!(EngineConfig::from_yaml_str("max_catch_up_ticks: 0").is_err());
        assert!(EngineConfig::from_yaml_str("slots: {primary: x, backup: x}").is_err());
        assert!(EngineConfig::from_yaml_str("tick_interval_secs: [1]").is_err());
    }

    #[test]
    fn missing_file_means_defaults() {
        let cfg = EngineConfig::load(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }
}
