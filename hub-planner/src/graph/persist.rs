//! Node-link JSON format for the finished graph.
//!
//! The layout follows the common node-link convention: a `nodes` array of
//! hubs and a `links` array of directed, keyed edges. Weights are written
//! with full precision, so a save/load round trip is lossless.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ConstituentStation, Edge, EdgeKind, Hub, HubId, LineId, Minutes, Mode};

use super::error::GraphError;
use super::model::HubGraph;

const TRANSFER_KEY: &str = "transfer";

/// A hub as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: HubId,
    pub name: String,
    /// Absent when the source never supplied coordinates.
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub modes: BTreeSet<Mode>,
    #[serde(default)]
    pub lines: BTreeSet<LineId>,
    #[serde(default)]
    pub constituents: Vec<ConstituentStation>,
}

/// An edge as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: HubId,
    pub target: HubId,
    /// Line identifier, or `transfer`.
    pub key: String,
    #[serde(default)]
    pub mode: Option<Mode>,
    pub weight: Option<Minutes>,
    #[serde(default)]
    pub transfer: bool,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub branch: Option<u32>,
}

/// The persisted graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl From<&HubGraph> for NodeLinkGraph {
    fn from(graph: &HubGraph) -> Self {
        let nodes = graph
            .hubs()
            .map(|hub| NodeRecord {
                id: hub.id.clone(),
                name: hub.name.clone(),
                lat: finite(hub.lat),
                lon: finite(hub.lon),
                modes: hub.modes.clone(),
                lines: hub.lines.clone(),
                constituents: hub.constituents.clone(),
            })
            .collect();

        let links = graph
            .edges()
            .map(|edge| {
                let mut link = LinkRecord {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    key: TRANSFER_KEY.to_string(),
                    mode: None,
                    weight: edge.weight,
                    transfer: true,
                    direction: None,
                    branch: None,
                };
                if let EdgeKind::Line {
                    line,
                    mode,
                    direction,
                    branch,
                } = &edge.kind
                {
                    link.key = line.as_str().to_string();
                    link.mode = Some(mode.clone());
                    link.transfer = false;
                    link.direction = direction.clone();
                    link.branch = *branch;
                }
                link
            })
            .collect();

        NodeLinkGraph {
            directed: true,
            multigraph: true,
            nodes,
            links,
        }
    }
}

impl TryFrom<NodeLinkGraph> for HubGraph {
    type Error = GraphError;

    fn try_from(doc: NodeLinkGraph) -> Result<Self, Self::Error> {
        let mut graph = HubGraph::new();

        for node in doc.nodes {
            let hub: &mut Hub = graph.upsert_hub(
                node.id.clone(),
                &node.name,
                node.lat.unwrap_or(f64::NAN),
                node.lon.unwrap_or(f64::NAN),
            );
            hub.modes = node.modes;
            hub.lines = node.lines;
            for station in node.constituents {
                graph.add_station(&node.id, station.id, &station.name)?;
            }
        }

        for (index, link) in doc.links.into_iter().enumerate() {
            let mut edge = if link.transfer {
                Edge::transfer(link.source, link.target)
            } else {
                let line = LineId::parse(link.key).map_err(|e| GraphError::InvalidLink {
                    index,
                    message: e.to_string(),
                })?;
                let mode = link.mode.ok_or_else(|| GraphError::InvalidLink {
                    index,
                    message: "line link without a mode".to_string(),
                })?;
                Edge::line(link.source, link.target, line, mode)
                    .with_route_info(link.direction, link.branch)
            };
            edge.weight = link.weight;

            if !graph.add_edge(edge)? {
                return Err(GraphError::InvalidLink {
                    index,
                    message: "duplicate (source, target, key)".to_string(),
                });
            }
        }

        Ok(graph)
    }
}

/// Write the graph to `path`, creating parent directories if needed.
pub fn save(graph: &HubGraph, path: impl AsRef<Path>) -> Result<(), GraphError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&NodeLinkGraph::from(graph))?;
    std::fs::write(path, json)?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Saved graph"
    );
    Ok(())
}

/// Read a graph written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<HubGraph, GraphError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let doc: NodeLinkGraph = serde_json::from_str(&json)?;
    let graph = HubGraph::try_from(doc)?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Loaded graph"
    );
    Ok(graph)
}
