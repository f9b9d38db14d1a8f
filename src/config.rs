//! Matcher configuration: signal weights, score threshold and result limit.
//!
//! The weights are a policy, not a constant of nature, so they live here rather
//! than in the scorer. A configuration can be built in code or read from a TOML
//! or JSON file; every field has a default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Error raised when a matcher configuration is unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A weight is negative, NaN or infinite.
    InvalidWeight {
        /// Which weight.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// All weights are zero, so no score can be normalized.
    ZeroTotalWeight,
    /// The weights are individually finite but their sum overflows.
    NonFiniteTotalWeight,
    /// The threshold is NaN or infinite.
    InvalidThreshold(f64),
    /// The configuration text could not be parsed.
    Parse(String),
    /// The configuration file could not be read.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidWeight { name, value } => {
                write!(f, "weight `{}` must be finite and non-negative, got {}", name, value)
            }
            ConfigError::ZeroTotalWeight => write!(f, "at least one weight must be positive"),
            ConfigError::NonFiniteTotalWeight => write!(f, "sum of weights must be finite"),
            ConfigError::InvalidThreshold(t) => write!(f, "threshold must be finite, got {}", t),
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
            ConfigError::Io(msg) => write!(f, "config I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Relative weight of each similarity signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Tag Jaccard weight.
    #[serde(default = "default_tag_weight")]
    pub tag: f64,
    /// Entity-type Jaccard weight.
    #[serde(default = "default_entity_weight")]
    pub entity: f64,
    /// Relation-type Jaccard weight.
    #[serde(default = "default_relation_weight")]
    pub relation: f64,
    /// Goal compatibility weight.
    #[serde(default = "default_goal_weight")]
    pub goal: f64,
}

// ── defaults ──

fn default_tag_weight() -> f64 {
    0.35
}
fn default_entity_weight() -> f64 {
    0.30
}
fn default_relation_weight() -> f64 {
    0.20
}
fn default_goal_weight() -> f64 {
    0.15
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tag: default_tag_weight(),
            entity: default_entity_weight(),
            relation: default_relation_weight(),
            goal: default_goal_weight(),
        }
    }
}

impl ScoringWeights {
    /// Creates a weight set.
    pub const fn new(tag: f64, entity: f64, relation: f64, goal: f64) -> Self {
        Self {
            tag,
            entity,
            relation,
            goal,
        }
    }

    /// Sum of all weights, accumulated in signal order.
    pub fn total(&self) -> f64 {
        self.tag + self.entity + self.relation + self.goal
    }

    /// Checks that every weight is finite and non-negative, that one is positive
    /// and that their sum is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("tag", self.tag),
            ("entity", self.entity),
            ("relation", self.relation),
            ("goal", self.goal),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let total = self.total();
        if !total.is_finite() {
            return Err(ConfigError::NonFiniteTotalWeight);
        }
        if total <= 0.0 {
            return Err(ConfigError::ZeroTotalWeight);
        }
        Ok(())
    }
}

/// Everything a single `match` call can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Signal weights.
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Results scoring strictly below this are dropped.
    #[serde(default)]
    pub threshold: f64,
    /// Maximum number of results, applied after sorting and filtering.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            threshold: 0.0,
            limit: None,
        }
    }
}

impl MatchConfig {
    /// Default weights, threshold `0.0`, no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the config with another threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the config with a result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the config with other weights.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validates weights and threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if !self.threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: MatchConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: MatchConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads a config file, falling back to defaults when it does not exist.
    ///
    /// `.json` files are read as JSON, anything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no matcher config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("reading {}: {}", path.display(), e)))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}
