//! Manual corrections applied to the constructed graph.
//!
//! Upstream data has known quirks (a line listed at a hub it does not stop
//! at, a missing connection). They are fixed by a versioned JSON document
//! applied once, in order, right after construction.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{Edge, EdgeKey, EdgeTriple, HubId, LineId, Minutes, Mode};

use super::error::GraphError;
use super::model::HubGraph;

/// Override document version this build understands.
pub const OVERRIDE_VERSION: u32 = 1;

/// One manual correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Override {
    /// Remove a line from a hub, dropping every edge of that line touching it.
    StripLine { hub: HubId, line: LineId },
    /// Insert a direct line edge, optionally with a known weight.
    InsertEdge {
        source: HubId,
        target: HubId,
        line: LineId,
        mode: Mode,
        #[serde(default)]
        weight: Option<Minutes>,
    },
    /// Remove one edge.
    RemoveEdge {
        source: HubId,
        target: HubId,
        key: EdgeKey,
    },
    /// Change a hub's display name.
    RenameHub { hub: HubId, name: String },
}

/// A versioned list of overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSet {
    pub version: u32,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl Default for OverrideSet {
    fn default() -> Self {
        Self {
            version: OVERRIDE_VERSION,
            overrides: Vec::new(),
        }
    }
}

/// Counts from one override pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideOutcome {
    pub applied: usize,
    /// Overrides whose hub or edge no longer exists.
    pub skipped: usize,
    pub edges_removed: usize,
}

impl OverrideSet {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Apply every override in order.
    ///
    /// Overrides that refer to missing hubs or edges are skipped with a
    /// warning, since upstream data may have caught up with them. An
    /// unsupported document version is an error and nothing is applied.
    pub fn apply(&self, graph: &mut HubGraph) -> Result<OverrideOutcome, GraphError> {
        if self.version != OVERRIDE_VERSION {
            return Err(GraphError::OverrideVersion {
                found: self.version,
                supported: OVERRIDE_VERSION,
            });
        }

        let mut outcome = OverrideOutcome::default();
        for (index, item) in self.overrides.iter().enumerate() {
            match apply_one(item, graph) {
                Ok(removed) => {
                    outcome.applied += 1;
                    outcome.edges_removed += removed;
                }
                Err(e) => {
                    warn!(index, error = %e, "Skipping override");
                    outcome.skipped += 1;
                }
            }
        }

        info!(
            applied = outcome.applied,
            skipped = outcome.skipped,
            edges_removed = outcome.edges_removed,
            "Applied graph overrides"
        );
        Ok(outcome)
    }
}

/// Apply one override, returning the number of edges it removed.
fn apply_one(item: &Override, graph: &mut HubGraph) -> Result<usize, GraphError> {
    match item {
        Override::StripLine { hub, line } => {
            let node = graph
                .hub_mut(hub)
                .ok_or_else(|| GraphError::UnknownHub(hub.clone()))?;
            node.lines.remove(line);
            let key = EdgeKey::Line(line.clone());
            Ok(graph.retain_edges(|e| {
                !(e.key() == key && (&e.source == hub || &e.target == hub))
            }))
        }
        Override::InsertEdge {
            source,
            target,
            line,
            mode,
            weight,
        } => {
            let mut edge = Edge::line(source.clone(), target.clone(), line.clone(), mode.clone());
            edge.weight = *weight;
            let triple = edge.triple();
            if !graph.add_edge(edge)? {
                // The edge exists; the override only pins its weight.
                if let (Some(existing), Some(w)) = (graph.edge_mut(&triple), weight) {
                    existing.weight = Some(*w);
                }
            }
            for end in [source, target] {
                if let Some(node) = graph.hub_mut(end) {
                    node.lines.insert(line.clone());
                    node.modes.insert(mode.clone());
                }
            }
            Ok(0)
        }
        Override::RemoveEdge {
            source,
            target,
            key,
        } => {
            let triple = EdgeTriple::new(source.clone(), target.clone(), key.clone());
            graph
                .remove_edge(&triple)
                .map(|_| 1)
                .ok_or(GraphError::UnknownEdge(triple))
        }
        Override::RenameHub { hub, name } => {
            let node = graph
                .hub_mut(hub)
                .ok_or_else(|| GraphError::UnknownHub(hub.clone()))?;
            node.name = name.clone();
            Ok(0)
        }
    }
}
