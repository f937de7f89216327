//! Raw duration observations, grouped by the edge they describe.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{EdgeKey, EdgeTriple, HubId, Minutes};
use crate::report::{IssueKind, StageReport};

use super::reconcile::ReconcilePolicy;

/// One raw travel time for a directed edge, before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationObservation {
    pub source: HubId,
    pub target: HubId,
    pub key: EdgeKey,
    pub minutes: f64,
    /// Where the value came from, e.g. `victoria from 940GZZLUBXN #2`.
    pub context: String,
}

impl DurationObservation {
    pub fn triple(&self) -> EdgeTriple {
        EdgeTriple::new(self.source.clone(), self.target.clone(), self.key.clone())
    }
}

/// Observations collected by one resolver run.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    by_edge: BTreeMap<EdgeTriple, Vec<(f64, String)>>,
    total: usize,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: DurationObservation) {
        let triple = observation.triple();
        self.by_edge
            .entry(triple)
            .or_default()
            .push((observation.minutes, observation.context));
        self.total += 1;
    }

    /// Total number of observations.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct edges observed.
    pub fn edge_count(&self) -> usize {
        self.by_edge.len()
    }

    #[cfg(test)]
    pub fn values(&self, triple: &EdgeTriple) -> Vec<f64> {
        self.by_edge
            .get(triple)
            .map(|v| v.iter().map(|(m, _)| *m).collect())
            .unwrap_or_default()
    }

    /// Reconcile every observed edge.
    ///
    /// Disagreements are recorded in `report` with the contexts involved;
    /// the reconciled weight is kept regardless.
    pub fn reconcile_all(
        &self,
        policy: &ReconcilePolicy,
        report: &mut StageReport,
    ) -> BTreeMap<EdgeTriple, Minutes> {
        debug!(
            observations = self.len(),
            edges = self.edge_count(),
            "Reconciling observations"
        );
        let mut weights = BTreeMap::new();
        for (triple, observed) in &self.by_edge {
            let values: Vec<f64> = observed.iter().map(|(m, _)| *m).collect();
            let Some(reconciled) = policy.reconcile(&values) else {
                report.record(
                    IssueKind::DataGap,
                    format!("{triple}: no usable observation"),
                );
                continue;
            };
            if reconciled.discrepant {
                let contexts: Vec<String> = observed
                    .iter()
                    .map(|(m, ctx)| format!("{m:.1} ({ctx})"))
                    .collect();
                report.record(
                    IssueKind::ReconciliationDiscrepancy,
                    format!(
                        "{triple}: spread {:.1} min, using {}: {}",
                        reconciled.spread,
                        reconciled.minutes,
                        contexts.join(", ")
                    ),
                );
            }
            debug!(edge = %triple, weight = %reconciled.minutes, n = reconciled.observations, "Reconciled");
            weights.insert(triple.clone(), reconciled.minutes);
        }
        weights
    }
}
