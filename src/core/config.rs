//! Configuration surface: per-task knobs recognized by the
//! orchestrator, serde-driven with documented defaults, following the
//! teacher's `core::config` pattern of `#[serde(default = "...")]` functions
//! and an explicit `validate()`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ValidationError};

/// Quality-gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateConfig {
    /// Minimum overall score required to pass.
    #[serde(default = "QualityGateConfig::default_min_overall")]
    pub min_overall: f64,
    /// Minimum security engine score required to pass, if a security result exists.
    #[serde(default = "QualityGateConfig::default_min_security")]
    pub min_security: f64,
}

impl QualityGateConfig {
    fn default_min_overall() -> f64 {
        80.0
    }

    fn default_min_security() -> f64 {
        90.0
    }
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_overall: Self::default_min_overall(),
            min_security: Self::default_min_security(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_timeout_serde() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// Per-task validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Enabled engine names. An empty set defaults to `{static}` at fan-out
    /// time, not here, so that an explicitly-empty config is
    /// still round-trippable.
    #[serde(default)]
    pub enabled_engines: Vec<String>,

    /// Overall per-task timeout, in seconds, serialized form of `timeout`.
    #[serde(rename = "timeout", default = "default_timeout_serde")]
    pub timeout_secs: u64,

    /// Whether engines fan out in parallel (true) or run sequentially (false).
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Engine weight overrides. Unlisted engines fall back to
    /// [`EngineWeights::default_for`]. Negative values are clamped to 0.
    #[serde(default)]
    pub weights: HashMap<String, f64>,

    /// Quality-gate thresholds.
    #[serde(default)]
    pub quality_gate: QualityGateConfig,

    /// Per-engine sub-configuration, keyed by engine name. Values are opaque
    /// to the orchestrator; each engine interprets its own key.
    #[serde(default)]
    pub engine_configs: HashMap<String, serde_json::Value>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled_engines: Vec::new(),
            timeout_secs: default_timeout_serde(),
            parallel: true,
            weights: HashMap::new(),
            quality_gate: QualityGateConfig::default(),
            engine_configs: HashMap::new(),
        }
    }
}

impl ValidationConfig {
    /// The effective timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            default_timeout()
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Effective weight for a named engine: an explicit override if present
    /// (negatives clamped to 0), otherwise [`EngineWeights::default_for`].
    pub fn weight_for(&self, engine: &str) -> f64 {
        self.weights
            .get(engine)
            .map(|w| w.max(0.0))
            .unwrap_or_else(|| EngineWeights::default_for(engine))
    }

    /// Enforce config-level invariants.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs > 0 && self.timeout_secs > 24 * 60 * 60 {
            return Err(ValidationError::config_field(
                "timeout must not exceed 24 hours",
                "timeout",
            ));
        }
        if self.weights.values().any(|w| w.is_nan()) {
            return Err(ValidationError::config_field(
                "engine weight must not be NaN",
                "weights",
            ));
        }
        if !(0.0..=100.0).contains(&self.quality_gate.min_overall) {
            return Err(ValidationError::config_field(
                "min_overall must be within [0, 100]",
                "quality_gate.min_overall",
            ));
        }
        if !(0.0..=100.0).contains(&self.quality_gate.min_security) {
            return Err(ValidationError::config_field(
                "min_security must be within [0, 100]",
                "quality_gate.min_security",
            ));
        }
        Ok(())
    }

    /// Parse a YAML document into a `ValidationConfig`.
    pub fn from_yaml(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Parse a JSON document into a `ValidationConfig`.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Default engine weights, overridable per-config.
pub struct EngineWeights;

impl EngineWeights {
    /// Default weight for a named engine, or the catch-all default for
    /// engines the orchestrator doesn't recognize by name.
    pub fn default_for(engine: &str) -> f64 {
        match engine {
            "static" => 0.25,
            "runtime" => 0.20,
            "security" => 0.25,
            "integration" => 0.15,
            "performance" => 0.15,
            _ => 0.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_minutes() {
        let config = ValidationConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn weight_override_is_respected() {
        let mut config = ValidationConfig::default();
        config.weights.insert("static".to_string(), 0.5);
        assert_eq!(config.weight_for("static"), 0.5);
        assert_eq!(config.weight_for("security"), 0.25);
    }

    #[test]
    fn negative_weight_override_clamps_to_zero() {
        let mut config = ValidationConfig::default();
        config.weights.insert("static".to_string(), -5.0);
        assert_eq!(config.weight_for("static"), 0.0);
    }

    #[test]
    fn unknown_engine_uses_catch_all_weight() {
        assert_eq!(EngineWeights::default_for("mystery"), 0.10);
    }

    #[test]
    fn validate_rejects_out_of_range_gate_thresholds() {
        let mut config = ValidationConfig::default();
        config.quality_gate.min_overall = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_round_trip() {
        let config = ValidationConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ValidationConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.timeout_secs, config.timeout_secs);
    }
}
