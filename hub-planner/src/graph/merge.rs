//! Final weight merge and graph validation.
//!
//! This is the only place final edge weights are written. After merging,
//! the graph must be fully weighted and structurally sound before it can be
//! published.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, warn};

use crate::domain::{EdgeTriple, Minutes};

use super::model::HubGraph;

/// Number of offending items listed per category in a failure message.
const SHOWN: usize = 5;

/// Counts from a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Edges that received a weight.
    pub applied: usize,
    /// Transfer edges removed because they never received a weight.
    pub pruned_transfers: usize,
}

/// Everything that stops a graph from being published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Edges that never received a weight.
    pub unresolved: Vec<EdgeTriple>,
    /// Resolved weights that matched no edge.
    pub unmatched: Vec<EdgeTriple>,
    /// Broken structural invariants.
    pub violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.unresolved.is_empty() && self.unmatched.is_empty() && self.violations.is_empty()
    }
}

fn list<T: fmt::Display>(items: &[T]) -> String {
    let shown: Vec<String> = items.iter().take(SHOWN).map(ToString::to_string).collect();
    if items.len() > SHOWN {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.unresolved.is_empty() {
            parts.push(format!(
                "{} unweighted edges ({})",
                self.unresolved.len(),
                list(&self.unresolved)
            ));
        }
        if !self.unmatched.is_empty() {
            parts.push(format!(
                "{} weights matched no edge ({})",
                self.unmatched.len(),
                list(&self.unmatched)
            ));
        }
        if !self.violations.is_empty() {
            parts.push(format!(
                "{} invariant violations ({})",
                self.violations.len(),
                list(&self.violations)
            ));
        }
        if parts.is_empty() {
            f.write_str("graph is valid")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// Write resolved weights onto their edges.
///
/// Returns the number applied and the triples that matched nothing.
pub fn apply_weights(
    graph: &mut HubGraph,
    weights: &BTreeMap<EdgeTriple, Minutes>,
) -> (usize, Vec<EdgeTriple>) {
    let mut applied = 0;
    let mut unmatched = Vec::new();
    for (triple, weight) in weights {
        match graph.edge_mut(triple) {
            Some(edge) => {
                edge.weight = Some(*weight);
                applied += 1;
            }
            None => unmatched.push(triple.clone()),
        }
    }
    (applied, unmatched)
}

/// Remove transfer pairs where either direction is unweighted.
///
/// Both directions go together so pairs stay symmetric.
pub fn prune_unresolved_transfers(graph: &mut HubGraph) -> usize {
    let doomed: Vec<EdgeTriple> = graph
        .edges()
        .filter(|e| e.is_transfer() && e.weight.is_none())
        .map(|e| e.triple())
        .collect();

    let mut removed = 0;
    for triple in doomed {
        for t in [triple.reversed(), triple] {
            if graph.remove_edge(&t).is_some() {
                warn!(edge = %t, "Dropping unresolved transfer");
                removed += 1;
            }
        }
    }
    removed
}

/// Check the graph's structural invariants.
///
/// Every constituent maps back to its own hub, transfers come in pairs with
/// equal weights and line weights are positive.
pub fn structural_violations(graph: &HubGraph) -> Vec<String> {
    let mut violations = Vec::new();

    for hub in graph.hubs() {
        for station in &hub.constituents {
            if graph.station_owner(&station.id) != Some(&hub.id) {
                violations.push(format!(
                    "station {} listed under {} is owned elsewhere",
                    station.id, hub.id
                ));
            }
        }
    }

    for edge in graph.edges() {
        if edge.is_transfer() {
            match graph.edge(&edge.triple().reversed()) {
                None => violations.push(format!("transfer {} has no reverse", edge.triple())),
                Some(back) if back.weight != edge.weight => violations.push(format!(
                    "transfer {} weight differs from its reverse",
                    edge.triple()
                )),
                Some(_) => {}
            }
        } else if edge.weight.is_some_and(|w| w.get() <= 0.0) {
            violations.push(format!("line {} has a non-positive weight", edge.triple()));
        }
    }

    violations
}

/// Merge resolved weights into the graph and validate the result.
///
/// With `drop_unresolved_transfers`, transfer pairs that never got a weight
/// are pruned before validation; any other unweighted edge fails it.
pub fn merge_and_validate(
    graph: &mut HubGraph,
    weights: &BTreeMap<EdgeTriple, Minutes>,
    drop_unresolved_transfers: bool,
) -> Result<MergeOutcome, ValidationReport> {
    let (applied, unmatched) = apply_weights(graph, weights);
    let pruned_transfers = if drop_unresolved_transfers {
        prune_unresolved_transfers(graph)
    } else {
        0
    };

    let report = ValidationReport {
        unresolved: graph.unresolved_edges().map(|e| e.triple()).collect(),
        unmatched,
        violations: structural_violations(graph),
    };
    if !report.is_valid() {
        warn!(%report, "Graph failed validation");
        return Err(report);
    }

    info!(
        applied,
        pruned_transfers,
        edges = graph.edge_count(),
        "Weights merged and graph validated"
    );
    Ok(MergeOutcome {
        applied,
        pruned_transfers,
    })
}
