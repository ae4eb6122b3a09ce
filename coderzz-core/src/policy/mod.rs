//! Epsilon-greedy selection over prompt templates
//!
//! The policy picks which template wraps the user's question, then learns
//! from helpful / not-helpful feedback which template to prefer.

mod action;
mod config;
mod value_table;

pub use action::{Action, ActionSet, PLACEHOLDER, TemplateSpec, default_templates, format_prompt};
pub use config::{DEFAULT_DISCOUNT_FACTOR, DEFAULT_EPSILON, DEFAULT_LEARNING_RATE, PolicyConfig};
pub use value_table::{ValueTable, choose_action, update_value};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::error::PolicyError;

/// Action set, value table, tunables and random source for one session
#[derive(Debug, Clone)]
pub struct TemplatePolicy {
    actions: ActionSet,
    values: ValueTable,
    config: PolicyConfig,
    rng: StdRng,
}

impl TemplatePolicy {
    /// Build a policy seeded from OS entropy.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build a policy with a fixed seed, for reproducible selection.
    pub fn with_seed(config: PolicyConfig, seed: u64) -> Result<Self, PolicyError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PolicyConfig, rng: StdRng) -> Result<Self, PolicyError> {
        config.validate()?;
        let actions = ActionSet::new(&config.templates)?;
        let values = ValueTable::new(actions.len())?;
        Ok(Self {
            actions,
            values,
            config,
            rng,
        })
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn action(&self, index: usize) -> Result<&Action, PolicyError> {
        self.actions.require(index)
    }

    /// Choose the template for the next generation.
    pub fn select(&mut self) -> Result<usize, PolicyError> {
        let index = choose_action(&self.values, self.config.epsilon, &mut self.rng)?;
        debug!(
            action = index,
            values = ?self.values.as_slice(),
            "Selected prompt template"
        );
        Ok(index)
    }

    /// Render the prompt for `question` using the action at `index`.
    pub fn prompt_for(&self, index: usize, question: &str) -> Result<String, PolicyError> {
        format_prompt(self.action(index)?, question)
    }

    /// Apply a reward for the action at `index`, returning the new value.
    pub fn learn(&mut self, index: usize, reward: f64) -> Result<f64, PolicyError> {
        let old = self.values.get(index);
        let new = update_value(
            &mut self.values,
            index,
            reward,
            self.config.learning_rate,
            self.config.discount_factor,
        )?;
        debug!(action = index, reward, ?old, new, "Updated template value");
        Ok(new)
    }

    /// Forget everything learned.
    pub fn reset_values(&mut self) {
        self.values.reset();
    }
}
