//! Value table and the epsilon-greedy / update rules over it
//!
//! The update is the one-step Q-learning rule applied to a single state:
//! the "next state" is the same table, so this is a multi-armed bandit
//! whose target is bootstrapped from the current best arm. It is not a
//! multi-state MDP and must not become one; learned values depend on the
//! exact arithmetic.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Per-action estimate of expected reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable(Vec<f64>);

impl ValueTable {
    /// Create a zero-initialised table for `n` actions.
    pub fn new(n: usize) -> Result<Self, PolicyError> {
        if n == 0 {
            return Err(PolicyError::InvalidConfig(
                "value table needs at least one action".to_string(),
            ));
        }
        Ok(Self(vec![0.0; n]))
    }

    /// Wrap existing values as-is.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Largest value, or `None` for an empty table.
    pub fn max(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::max)
    }

    /// Index of the largest value; ties go to the lowest index.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.0.iter().enumerate() {
            match best {
                Some((_, best_v)) if v <= best_v => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Set every value back to 0.0, keeping the size.
    pub fn reset(&mut self) {
        self.0.iter_mut().for_each(|v| *v = 0.0);
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PolicyError::InvalidInput(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Pick an action index epsilon-greedily.
///
/// Draws `r` uniform in `[0, 1)`; if `r < epsilon` returns a uniformly random
/// index, otherwise the stable argmax of the table.
///
/// # Errors
///
/// `InvalidConfig` if the table is empty or `epsilon` is outside `[0, 1]`.
pub fn choose_action<R: Rng + ?Sized>(
    values: &ValueTable,
    epsilon: f64,
    rng: &mut R,
) -> Result<usize, PolicyError> {
    if values.is_empty() {
        return Err(PolicyError::InvalidConfig(
            "cannot choose from an empty value table".to_string(),
        ));
    }
    if !(epsilon.is_finite() && (0.0..=1.0).contains(&epsilon)) {
        return Err(PolicyError::InvalidConfig(format!(
            "epsilon must be within [0, 1], got {epsilon}"
        )));
    }

    let r: f64 = rng.r#gen();
    if r < epsilon {
        Ok(rng.gen_range(0..values.len()))
    } else {
        // Non-empty was checked above.
        Ok(values.argmax().unwrap_or(0))
    }
}

/// Apply one feedback step to `values[action_index]` and return the new value.
///
/// `new = old + learning_rate * (reward + discount_factor * max(values) - old)`,
/// with `max` taken before the update. Nothing is modified if validation fails.
///
/// # Errors
///
/// `InvalidInput` if the index is out of range, either rate is outside
/// `[0, 1]`, or the reward is not finite.
pub fn update_value(
    values: &mut ValueTable,
    action_index: usize,
    reward: f64,
    learning_rate: f64,
    discount_factor: f64,
) -> Result<f64, PolicyError> {
    let Some(old) = values.get(action_index) else {
        return Err(PolicyError::InvalidInput(format!(
            "action index {} out of range (0..{})",
            action_index,
            values.len()
        )));
    };
    check_unit_interval("learning_rate", learning_rate)?;
    check_unit_interval("discount_factor", discount_factor)?;
    if !reward.is_finite() {
        return Err(PolicyError::InvalidInput(format!(
            "reward must be finite, got {reward}"
        )));
    }

    let best = values.max().unwrap_or(old);
    let new = old + learning_rate * (reward + discount_factor * best - old);
    values.0[action_index] = new;
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn new_table_is_zeroed() {
        let table = ValueTable::new(4).unwrap();
        assert_eq!(table.as_slice(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn new_table_rejects_zero_actions() {
        assert!(matches!(
            ValueTable::new(0),
            Err(PolicyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn argmax_breaks_ties_by_lowest_index() {
        assert_eq!(ValueTable::from_values(vec![0.0; 4]).argmax(), Some(0));
        assert_eq!(
            ValueTable::from_values(vec![0.1, 0.5, 0.5, -1.0]).argmax(),
            Some(1)
        );
        assert_eq!(ValueTable::from_values(vec![]).argmax(), None);
    }

    #[test]
    fn greedy_choice_is_deterministic() {
        let table = ValueTable::from_values(vec![0.0, 0.2, 0.9, 0.1]);
        let mut rng = rng();
        for _ in 0..1_000 {
            assert_eq!(choose_action(&table, 0.0, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn zero_table_greedy_picks_first_action() {
        let table = ValueTable::new(4).unwrap();
        assert_eq!(choose_action(&table, 0.0, &mut rng()).unwrap(), 0);
    }

    #[test]
    fn full_exploration_is_roughly_uniform() {
        let table = ValueTable::from_values(vec![5.0, 0.0, 0.0, 0.0]);
        let mut rng = rng();
        let trials = 40_000;
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            counts[choose_action(&table, 1.0, &mut rng).unwrap()] += 1;
        }
        let expected = trials as f64 / 4.0;
        for count in counts {
            // ~5 standard deviations for a binomial with p = 0.25
            assert!(
                (count as f64 - expected).abs() < 450.0,
                "counts not uniform: {counts:?}"
            );
        }
    }

    #[test]
    fn choose_rejects_bad_epsilon_and_empty_table() {
        let table = ValueTable::new(2).unwrap();
        let mut rng = rng();
        for eps in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                choose_action(&table, eps, &mut rng),
                Err(PolicyError::InvalidConfig(_))
            ));
        }
        assert!(matches!(
            choose_action(&ValueTable::from_values(vec![]), 0.1, &mut rng),
            Err(PolicyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_action_table_always_returns_it() {
        let table = ValueTable::new(1).unwrap();
        let mut rng = rng();
        for eps in [0.0, 0.5, 1.0] {
            assert_eq!(choose_action(&table, eps, &mut rng).unwrap(), 0);
        }
    }

    #[test]
    fn update_matches_worked_example() {
        let mut table = ValueTable::new(4).unwrap();
        let new = update_value(&mut table, 0, 1.0, 0.1, 0.9).unwrap();
        assert!((new - 0.1).abs() < 1e-12);
        assert!((table.as_slice()[0] - 0.1).abs() < 1e-12);
        assert_eq!(&table.as_slice()[1..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn update_bootstraps_from_best_value_before_update() {
        let mut table = ValueTable::from_values(vec![0.0, 0.5]);
        // 0 + 0.5 * (-1 + 0.9 * 0.5 - 0) = -0.275
        let new = update_value(&mut table, 0, -1.0, 0.5, 0.9).unwrap();
        assert!((new + 0.275).abs() < 1e-12);
    }

    #[test]
    fn update_moves_toward_target_each_call() {
        let mut table = ValueTable::new(4).unwrap();
        let mut previous = 0.0;
        for _ in 0..50 {
            let target = 1.0 + 0.5 * table.max().unwrap();
            let new = update_value(&mut table, 2, 1.0, 0.2, 0.5).unwrap();
            assert!(new > previous);
            assert!(new <= target + 1e-12);
            previous = new;
        }
        // fixed point of v = 1 + 0.5 v
        assert!((previous - 2.0).abs() < 0.01);
    }

    #[test]
    fn update_is_stable_at_fixed_point() {
        let mut table = ValueTable::from_values(vec![-1.0, -2.0]);
        // With gamma = 0 the target is the reward itself.
        let new = update_value(&mut table, 0, -1.0, 0.3, 0.0).unwrap();
        assert_eq!(new, -1.0);
    }

    #[test]
    fn update_rejects_bad_arguments_without_mutating() {
        let mut table = ValueTable::from_values(vec![0.3, 0.0, 0.0, 0.0]);
        let before = table.clone();

        assert!(matches!(
            update_value(&mut table, 5, 1.0, 0.1, 0.9),
            Err(PolicyError::InvalidInput(_))
        ));
        assert!(matches!(
            update_value(&mut table, 0, 1.0, 1.5, 0.9),
            Err(PolicyError::InvalidInput(_))
        ));
        assert!(matches!(
            update_value(&mut table, 0, 1.0, 0.1, -0.1),
            Err(PolicyError::InvalidInput(_))
        ));
        assert!(matches!(
            update_value(&mut table, 0, f64::INFINITY, 0.1, 0.9),
            Err(PolicyError::InvalidInput(_))
        ));
        assert_eq!(table, before);
    }

    #[test]
    fn reset_zeroes_values_and_keeps_size() {
        let mut table = ValueTable::from_values(vec![0.4, -0.2, 0.9]);
        table.reset();
        assert_eq!(table.as_slice(), &[0.0, 0.0, 0.0]);
    }
}
