use serde::{Deserialize, Serialize};

use super::action::{TemplateSpec, default_templates};
use crate::error::PolicyError;

pub const DEFAULT_EPSILON: f64 = 0.1;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_DISCOUNT_FACTOR: f64 = 0.9;

/// Tunables for the template policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Probability of picking a random template instead of the best one
    pub epsilon: f64,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub templates: Vec<TemplateSpec>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            learning_rate: DEFAULT_LEARNING_RATE,
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
            templates: default_templates(),
        }
    }
}

impl PolicyConfig {
    /// Check rates are in `[0, 1]`. Templates are checked when the action set
    /// is built.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (name, value) in [
            ("epsilon", self.epsilon),
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(PolicyError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.templates.is_empty() {
            return Err(PolicyError::InvalidConfig(
                "at least one prompt template is required".to_string(),
            ));
        }
        Ok(())
    }
}
