//! Evaluator configuration.

use serde::{Deserialize, Serialize};

/// Which values count as true in conditions, `not`, `and`, `or` and `assert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truthiness {
    /// Only `True` is truthy. `if 1:` does not run its body.
    #[default]
    Strict,
    /// Python rules: non-zero ints and functions are truthy, `None` is not.
    Python,
}

/// Evaluator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub truthiness: Truthiness,
    /// Nested interpreted calls allowed before `CallDepthExceeded`.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            truthiness: Truthiness::Strict,
            max_call_depth: 1000,
        }
    }
}

impl Config {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
