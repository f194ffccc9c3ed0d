//! Time management for temporal graph replay
//!
//! The replay operates in discrete timesteps. AMLSim stamps every
//! transaction with the step at which it happens, so one timestep of
//! simulation time corresponds to one ledger entry. Consecutive steps can be
//! grouped into periods (e.g. 7 steps for a week) when history is sampled.

use serde::{Deserialize, Serialize};

/// Manages replay time in discrete steps and periods
///
/// # Example
/// ```
/// use aml_graph_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(7); // weekly periods
/// assert_eq!(time.current_step(), 0);
/// assert_eq!(time.current_period(), 0);
///
/// time.advance_step();
/// assert_eq!(time.current_step(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeManager {
    /// Total steps applied since replay start
    current_step: usize,
    /// Number of steps in one period
    steps_per_period: usize,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Arguments
    /// * `steps_per_period` - Number of steps grouped into one period
    ///
    /// # Panics
    /// Panics if `steps_per_period` is zero
    pub fn new(steps_per_period: usize) -> Self {
        assert!(steps_per_period > 0, "steps_per_period must be positive");
        Self {
            current_step: 0,
            steps_per_period,
        }
    }

    /// Advance time by one step
    pub fn advance_step(&mut self) {
        self.current_step += 1;
    }

    /// Rewind to step 0
    ///
    /// # Example
    /// ```
    /// use aml_graph_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(1);
    /// time.advance_step();
    /// time.reset();
    /// assert_eq!(time.current_step(), 0);
    /// ```
    pub fn reset(&mut self) {
        self.current_step = 0;
    }

    /// Get the current step (the next timestep to be applied)
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Get the current period (0-indexed)
    ///
    /// # Example
    /// ```
    /// use aml_graph_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(7);
    /// for _ in 0..7 {
    ///     time.advance_step();
    /// }
    /// assert_eq!(time.current_period(), 1);
    /// ```
    pub fn current_period(&self) -> usize {
        self.current_step / self.steps_per_period
    }

    /// Get the step within the current period (0-indexed)
    pub fn step_within_period(&self) -> usize {
        self.current_step % self.steps_per_period
    }

    /// True when at least one step has run and the last one closed a period
    pub fn is_period_boundary(&self) -> bool {
        self.current_step > 0 && self.step_within_period() == 0
    }

    /// Get steps per period
    pub fn steps_per_period(&self) -> usize {
        self.steps_per_period
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "steps_per_period must be positive")]
    fn test_zero_steps_per_period_panics() {
        TimeManager::new(0);
    }

    #[test]
    fn test_period_boundary_not_at_start() {
        let time = TimeManager::new(3);
        assert!(!time.is_period_boundary());
    }
}
