//! Runner configuration
//!
//! Controls how a [`BlockLogicRunner`](super::BlockLogicRunner) treats newly
//! added blocks and out-of-contract tick deltas.

use serde::{Deserialize, Serialize};

/// Frame length used by `tick(None)` unless configured otherwise
pub const DEFAULT_DT: f64 = 1.0 / 60.0;

/// What to do with a negative or non-finite `dt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DtPolicy {
    /// Treat it as zero and log a warning
    #[default]
    Clamp,
    /// Return `Error::InvalidDelta` without advancing the tick counter
    Reject,
}

/// Configuration for a block logic runner
///
/// # Example
///
/// ```
/// use wirelogic_core::{DtPolicy, RunnerConfig};
///
/// let config = RunnerConfig::default();
/// assert!(config.auto_enable());
/// assert_eq!(config.dt_policy(), DtPolicy::Clamp);
///
/// let config = RunnerConfig::default()
///     .with_dt_policy(DtPolicy::Reject)
///     .with_max_dt(0.25);
/// assert_eq!(config.max_dt(), Some(0.25));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Enable blocks that are still Constructed when they are added
    auto_enable: bool,
    /// Handling of negative or non-finite deltas
    dt_policy: DtPolicy,
    /// Delta used when `tick` is called without one
    ///
    /// Always finite and non-negative.
    default_dt: f64,
    /// Upper bound applied to every accepted delta
    max_dt: Option<f64>,
}

impl RunnerConfig {
    /// Whether added blocks are enabled automatically
    pub fn auto_enable(&self) -> bool {
        self.auto_enable
    }

    /// Set whether added blocks are enabled automatically
    pub fn set_auto_enable(&mut self, auto_enable: bool) {
        self.auto_enable = auto_enable;
    }

    /// Builder form of [`RunnerConfig::set_auto_enable`]
    pub fn with_auto_enable(mut self, auto_enable: bool) -> Self {
        self.set_auto_enable(auto_enable);
        self
    }

    /// Policy for out-of-contract deltas
    pub fn dt_policy(&self) -> DtPolicy {
        self.dt_policy
    }

    /// Set the policy for out-of-contract deltas
    pub fn set_dt_policy(&mut self, policy: DtPolicy) {
        self.dt_policy = policy;
    }

    /// Builder form of [`RunnerConfig::set_dt_policy`]
    pub fn with_dt_policy(mut self, policy: DtPolicy) -> Self {
        self.set_dt_policy(policy);
        self
    }

    /// Delta used by `tick(None)`
    pub fn default_dt(&self) -> f64 {
        self.default_dt
    }

    /// Set the delta used by `tick(None)`
    ///
    /// Negative or non-finite values fall back to [`DEFAULT_DT`].
    ///
    /// ```
    /// use wirelogic_core::{RunnerConfig, DEFAULT_DT};
    ///
    /// let mut config = RunnerConfig::default();
    /// config.set_default_dt(0.1);
    /// assert_eq!(config.default_dt(), 0.1);
    ///
    /// config.set_default_dt(-1.0);
    /// assert_eq!(config.default_dt(), DEFAULT_DT);
    /// ```
    pub fn set_default_dt(&mut self, dt: f64) {
        self.default_dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            DEFAULT_DT
        };
    }

    /// Builder form of [`RunnerConfig::set_default_dt`]
    pub fn with_default_dt(mut self, dt: f64) -> Self {
        self.set_default_dt(dt);
        self
    }

    /// Upper bound on accepted deltas
    pub fn max_dt(&self) -> Option<f64> {
        self.max_dt
    }

    /// Set the upper bound on accepted deltas
    ///
    /// Negative or non-finite bounds remove the limit.
    pub fn set_max_dt(&mut self, max_dt: f64) {
        self.max_dt = (max_dt.is_finite() && max_dt >= 0.0).then_some(max_dt);
    }

    /// Builder form of [`RunnerConfig::set_max_dt`]
    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.set_max_dt(max_dt);
        self
    }

    /// Remove the upper bound on accepted deltas
    pub fn clear_max_dt(&mut self) {
        self.max_dt = None;
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            auto_enable: true,
            dt_policy: DtPolicy::Clamp,
            default_dt: DEFAULT_DT,
            max_dt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert!(config.auto_enable());
        assert_eq!(config.dt_policy(), DtPolicy::Clamp);
        assert_eq!(config.default_dt(), DEFAULT_DT);
        assert_eq!(config.max_dt(), None);
    }

    #[test]
    fn test_setters_reject_bad_values() {
        let mut config = RunnerConfig::default();
        config.set_default_dt(f64::NAN);
        assert_eq!(config.default_dt(), DEFAULT_DT);

        config.set_max_dt(0.5);
        assert_eq!(config.max_dt(), Some(0.5));
        config.set_max_dt(f64::INFINITY);
        assert_eq!(config.max_dt(), None, "infinite bound means no bound");
    }

    #[test]
    fn test_from_ron_with_missing_fields() {
        let config: RunnerConfig =
            ron::from_str("(dt_policy: Reject)").expect("partial config should parse");
        assert_eq!(config.dt_policy(), DtPolicy::Reject);
        assert!(config.auto_enable(), "missing fields take their defaults");
        assert_eq!(config.default_dt(), DEFAULT_DT);
    }
}
