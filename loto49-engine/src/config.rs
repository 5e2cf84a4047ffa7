use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Tuning knobs for [`crate::generator`]. Every field has a default, so a
/// partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Resamples allowed for a colliding combination before it is kept anyway.
    pub max_retries: usize,
    /// Fail history-driven methods with too little history instead of
    /// degrading to uniform weights.
    pub strict_history: bool,
    /// Draws needed before history-driven methods count as informed.
    pub min_history: usize,
    /// Per-step weight of older follow-on transitions, in (0, 1]; 1 disables decay.
    pub follow_on_decay: f64,
    /// Assemble batches with rayon.
    pub parallel: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 20,
            strict_history: false,
            min_history: 2,
            follow_on_decay: 1.0,
            parallel: false,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenerateError> {
        if !(self.follow_on_decay > 0.0 && self.follow_on_decay <= 1.0) {
            return Err(GenerateError::InvalidConfig(format!(
                "follow_on_decay must be in (0, 1], got {}",
                self.follow_on_decay
            )));
        }
        Ok(())
    }
}
