//! Estimator options and their environment overrides.
//!
//! Options start from [`TraceConfig::default`] and are merged with the
//! process environment by [`TraceConfig::merge_env`]. Frontends (CLI, Python)
//! apply their own flags on top of the merged value.
//!
//! Recognized variables:
//! - `PQP_TRACE_STRATEGY` = `sequential` | `parallel`
//! - `PQP_TRACE_THREADS` = `<usize>` (0 = rayon's global pool)
//! - `PQP_TRACE_PROGRESS` = `1|true|on` | `0|false|off`
//! - `PQP_TRACE_MOM_GROUPS` = `<usize>` (≤ 1 = plain mean)
//!
//! Unrecognized values are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

/// Env var selecting [`Strategy`].
pub const ENV_STRATEGY: &str = "PQP_TRACE_STRATEGY";
/// Env var for the worker thread count.
pub const ENV_THREADS: &str = "PQP_TRACE_THREADS";
/// Env var toggling the progress bar.
pub const ENV_PROGRESS: &str = "PQP_TRACE_PROGRESS";
/// Env var selecting median-of-means with that many groups.
pub const ENV_MOM_GROUPS: &str = "PQP_TRACE_MOM_GROUPS";

/// How the pair loop is executed. Both produce bit-identical results.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Single thread, row by row.
    Sequential,
    /// Rows fanned out over a rayon pool, partial sums reduced in row order.
    #[default]
    Parallel,
}

/// How per-pair values are combined into the estimate.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Mean over all unordered shot pairs.
    #[default]
    Mean,
    /// Median of per-group pair means over `groups` contiguous shot groups.
    MedianOfMeans {
        /// Number of groups (≥ 1; each group needs ≥ 2 shots).
        groups: usize,
    },
}

/// Options for [`crate::TraceEstimator`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceConfig {
    /// Execution strategy.
    pub strategy: Strategy,
    /// Aggregation rule.
    pub aggregation: Aggregation,
    /// Dedicated pool size for `Parallel` (`None` = global rayon pool).
    pub threads: Option<usize>,
    /// Draw a progress bar on stderr (no-op without the `progress` feature).
    pub progress: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Parallel,
            aggregation: Aggregation::Mean,
            threads: None,
            progress: false,
        }
    }
}

impl TraceConfig {
    /// Defaults merged with the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply environment overrides to `self`.
    #[must_use]
    pub fn merge_env(self) -> Self {
        self.merge_with(|k| std::env::var(k).ok())
    }

    /// Apply overrides from an arbitrary key lookup (tests inject a map here).
    #[must_use]
    pub fn merge_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(s) = lookup(ENV_STRATEGY) {
            match s.trim().to_ascii_lowercase().as_str() {
                "sequential" | "seq" => self.strategy = Strategy::Sequential,
                "parallel" | "par" => self.strategy = Strategy::Parallel,
                _ => {}
            }
        }
        if let Some(t) = lookup(ENV_THREADS) {
            if let Ok(n) = t.trim().parse::<usize>() {
                self.threads = (n > 0).then_some(n);
            }
        }
        if let Some(p) = lookup(ENV_PROGRESS) {
            match p.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => self.progress = true,
                "0" | "false" | "off" | "no" => self.progress = false,
                _ => {}
            }
        }
        if let Some(g) = lookup(ENV_MOM_GROUPS) {
            if let Ok(groups) = g.trim().parse::<usize>() {
                self.aggregation = if groups > 1 {
                    Aggregation::MedianOfMeans { groups }
                } else {
                    Aggregation::Mean
                };
            }
        }
        self
    }

    /// Builder-style strategy override.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder-style aggregation override.
    #[must_use]
    pub const fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Builder-style thread count override (`0` = global pool).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = (threads > 0).then_some(threads);
        self
    }

    /// Builder-style progress toggle.
    #[must_use]
    pub const fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Check the configuration against a record with `shots` shots.
    pub fn validate(&self, shots: usize) -> TraceResult<()> {
        if let Aggregation::MedianOfMeans { groups } = self.aggregation {
            if groups == 0 {
                return Err(TraceError::invalid_config(
                    "median-of-means needs at least one group",
                ));
            }
            if shots / groups < 2 {
                return Err(TraceError::invalid_config(format!(
                    "{shots} shots cannot fill {groups} groups of at least 2 shots"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = TraceConfig::default().merge_with(env(&[
            (ENV_STRATEGY, "Sequential"),
            (ENV_THREADS, "4"),
            (ENV_PROGRESS, "on"),
            (ENV_MOM_GROUPS, "5"),
        ]));
        assert_eq!(cfg.strategy, Strategy::Sequential);
        assert_eq!(cfg.threads, Some(4));
        assert!(cfg.progress);
        assert_eq!(cfg.aggregation, Aggregation::MedianOfMeans { groups: 5 });
    }

    #[test]
    fn unknown_values_are_ignored() {
        let cfg = TraceConfig::default().merge_with(env(&[
            (ENV_STRATEGY, "gpu"),
            (ENV_THREADS, "many"),
            (ENV_PROGRESS, "maybe"),
        ]));
        assert_eq!(cfg, TraceConfig::default());
    }

    #[test]
    fn mom_groups_of_one_means_mean() {
        let cfg = TraceConfig::default()
            .with_aggregation(Aggregation::MedianOfMeans { groups: 3 })
            .merge_with(env(&[(ENV_MOM_GROUPS, "1")]));
        assert_eq!(cfg.aggregation, Aggregation::Mean);
    }

    #[test]
    fn validate_rejects_thin_groups() {
        let cfg = TraceConfig::default().with_aggregation(Aggregation::MedianOfMeans { groups: 3 });
        assert!(cfg.validate(6).is_ok());
        assert!(cfg.validate(5).is_err());
        let zero = TraceConfig::default().with_aggregation(Aggregation::MedianOfMeans { groups: 0 });
        assert!(zero.validate(100).is_err());
    }
}
