//! Reduction of several duration observations to one edge weight.

use serde::{Deserialize, Serialize};

use crate::domain::Minutes;

/// How several agreeing observations are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Median,
    Mean,
}

/// When observations count as agreeing.
///
/// Either bound is enough: a spread within `absolute` minutes, or a spread
/// within `relative` of the median.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 2.0,
            relative: 0.3,
        }
    }
}

impl Tolerance {
    pub fn accepts(&self, spread: f64, median: f64) -> bool {
        spread <= self.absolute || (median > 0.0 && spread / median <= self.relative)
    }
}

/// The outcome of reconciling one edge's observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub minutes: Minutes,
    pub observations: usize,
    /// Largest minus smallest observation.
    pub spread: f64,
    /// The observations disagreed beyond tolerance. The weight is still
    /// usable; the disagreement is only reported.
    pub discrepant: bool,
}

/// Reconciliation rules shared by all resolvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    pub tolerance: Tolerance,
    pub aggregate: Aggregate,
    /// Smallest weight a resolver may produce.
    pub floor: Minutes,
}

impl ReconcilePolicy {
    pub fn new(floor: Minutes) -> Self {
        Self {
            tolerance: Tolerance::default(),
            aggregate: Aggregate::default(),
            floor,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    /// Reconcile raw observations of one directed edge.
    ///
    /// Non-finite values are ignored. Returns `None` when nothing usable is
    /// left, which leaves the edge unresolved.
    ///
    /// ```
    /// use hub_planner::domain::Minutes;
    /// use hub_planner::resolve::ReconcilePolicy;
    ///
    /// let policy = ReconcilePolicy::new(Minutes::new(0.5).unwrap());
    /// let r = policy.reconcile(&[10.0, 10.5, 11.0]).unwrap();
    /// assert_eq!(r.minutes.get(), 10.5);
    /// assert!(!r.discrepant);
    /// ```
    pub fn reconcile(&self, observations: &[f64]) -> Option<Reconciled> {
        let mut values: Vec<f64> = observations
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let spread = values[values.len() - 1] - values[0];
        let median = median_of_sorted(&values);
        let discrepant = values.len() > 1 && !self.tolerance.accepts(spread, median);
        let raw = match self.aggregate {
            Aggregate::Median => median,
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };

        Some(Reconciled {
            minutes: Minutes::clamped(raw, self.floor),
            observations: values.len(),
            spread,
            discrepant,
        })
    }
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> ReconcilePolicy {
        ReconcilePolicy::new(Minutes::new(0.5).unwrap())
    }

    #[test]
    fn agreeing_observations_take_the_median() {
        let r = policy().reconcile(&[11.0, 10.0, 10.5]).unwrap();
        assert_eq!(r.minutes.get(), 10.5);
        assert_eq!(r.observations, 3);
        assert!(!r.discrepant);
    }

    #[test]
    fn disagreeing_observations_are_flagged_not_dropped() {
        let r = policy().reconcile(&[5.0, 20.0]).unwrap();
        assert_eq!(r.minutes.get(), 12.5);
        assert_eq!(r.spread, 15.0);
        assert!(r.discrepant);
    }

    #[test]
    fn relative_tolerance_alone_is_enough() {
        // Spread 6 exceeds the absolute bound but is 20% of the median.
        let r = policy().reconcile(&[27.0, 30.0, 33.0]).unwrap();
        assert!(!r.discrepant);
    }

    #[test]
    fn single_observation_is_rounded_and_floored() {
        assert_eq!(policy().reconcile(&[2.24]).unwrap().minutes.get(), 2.2);
        assert_eq!(policy().reconcile(&[0.0]).unwrap().minutes.get(), 0.5);
        assert_eq!(policy().reconcile(&[-3.0]).unwrap().minutes.get(), 0.5);
    }

    #[test]
    fn nothing_usable_is_unresolved() {
        assert!(policy().reconcile(&[]).is_none());
        assert!(policy().reconcile(&[f64::NAN, f64::INFINITY]).is_none());
    }

    #[test]
    fn mean_aggregate() {
        let r = policy()
            .with_aggregate(Aggregate::Mean)
            .reconcile(&[1.0, 2.0, 6.0])
            .unwrap();
        assert_eq!(r.minutes.get(), 3.0);
    }

    proptest! {
        #[test]
        fn result_lies_within_observed_range(values in prop::collection::vec(0.5f64..120.0, 1..12)) {
            let r = policy().reconcile(&values).unwrap();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            // Rounding to one decimal can move the result by 0.05.
            prop_assert!(r.minutes.get() >= min - 0.05 - 1e-9);
            prop_assert!(r.minutes.get() <= max + 0.05 + 1e-9);
            prop_assert!(r.minutes >= policy().floor);
        }

        #[test]
        fn order_does_not_matter(mut values in prop::collection::vec(0.0f64..60.0, 1..10)) {
            let forward = policy().reconcile(&values).unwrap();
            values.reverse();
            let backward = policy().reconcile(&values).unwrap();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn tight_observations_never_flag(base in 1.0f64..60.0, jitter in prop::collection::vec(0.0f64..2.0, 2..8)) {
            let values: Vec<f64> = jitter.iter().map(|j| base + j).collect();
            prop_assert!(!policy().reconcile(&values).unwrap().discrepant);
        }
    }
}
