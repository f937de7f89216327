//! The hub-level directed multigraph.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{Edge, EdgeKey, EdgeTriple, Hub, HubId, StationId};

use super::error::GraphError;

/// Directed multigraph of hubs, with at most one edge per
/// (source, target, key).
///
/// Every constituent station belongs to exactly one hub; the graph keeps a
/// station index so station identifiers from upstream data can be mapped
/// back to their hub.
#[derive(Debug, Clone, Default)]
pub struct HubGraph {
    hubs: BTreeMap<HubId, Hub>,
    edges: BTreeMap<EdgeTriple, Edge>,
    adjacency: HashMap<HubId, Vec<EdgeTriple>>,
    station_index: HashMap<StationId, HubId>,
}

impl HubGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.hubs.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn hub(&self, id: &HubId) -> Option<&Hub> {
        self.hubs.get(id)
    }

    pub fn hub_mut(&mut self, id: &HubId) -> Option<&mut Hub> {
        self.hubs.get_mut(id)
    }

    pub fn contains_hub(&self, id: &HubId) -> bool {
        self.hubs.contains_key(id)
    }

    /// Hubs in identifier order.
    pub fn hubs(&self) -> impl Iterator<Item = &Hub> {
        self.hubs.values()
    }

    /// Insert a hub if absent and return it.
    ///
    /// An existing hub keeps its name; missing coordinates are filled in.
    pub fn upsert_hub(&mut self, id: HubId, name: &str, lat: f64, lon: f64) -> &mut Hub {
        let hub = self
            .hubs
            .entry(id.clone())
            .or_insert_with(|| Hub::new(id, name, lat, lon));
        if !(hub.lat.is_finite() && hub.lon.is_finite()) && lat.is_finite() && lon.is_finite() {
            hub.lat = lat;
            hub.lon = lon;
        }
        hub
    }

    /// Add a constituent station to a hub.
    ///
    /// Returns `Ok(false)` if the hub already lists the station. A station
    /// owned by another hub is a conflict.
    pub fn add_station(
        &mut self,
        hub_id: &HubId,
        station: StationId,
        name: &str,
    ) -> Result<bool, GraphError> {
        if let Some(existing) = self.station_index.get(&station) {
            if existing != hub_id {
                return Err(GraphError::StationConflict {
                    station,
                    existing: existing.clone(),
                    requested: hub_id.clone(),
                });
            }
        }
        let hub = self
            .hubs
            .get_mut(hub_id)
            .ok_or_else(|| GraphError::UnknownHub(hub_id.clone()))?;
        self.station_index.insert(station.clone(), hub_id.clone());
        Ok(hub.add_constituent(station, name))
    }

    /// The hub a station was registered under.
    pub fn station_owner(&self, station: &StationId) -> Option<&HubId> {
        self.station_index.get(station)
    }

    /// The hub owning a station, if any.
    ///
    /// A hub whose identifier equals the station's is also found, since
    /// upstream data often refers to a hub by its own identifier.
    pub fn hub_for_station(&self, station: &StationId) -> Option<&HubId> {
        self.station_index.get(station).or_else(|| {
            self.hubs
                .get_key_value(&HubId::from(station.clone()))
                .map(|(id, _)| id)
        })
    }

    /// Add an edge unless one with the same triple exists.
    ///
    /// Returns `Ok(false)` for a duplicate; the existing edge is left as is.
    pub fn add_edge(&mut self, edge: Edge) -> Result<bool, GraphError> {
        if edge.source == edge.target {
            return Err(GraphError::SelfLoop(edge.source));
        }
        for end in [&edge.source, &edge.target] {
            if !self.hubs.contains_key(end) {
                return Err(GraphError::UnknownHub(end.clone()));
            }
        }
        let triple = edge.triple();
        if self.edges.contains_key(&triple) {
            return Ok(false);
        }
        self.adjacency
            .entry(triple.source.clone())
            .or_default()
            .push(triple.clone());
        self.edges.insert(triple, edge);
        Ok(true)
    }

    pub fn remove_edge(&mut self, triple: &EdgeTriple) -> Option<Edge> {
        let edge = self.edges.remove(triple)?;
        if let Some(out) = self.adjacency.get_mut(&triple.source) {
            out.retain(|t| t != triple);
        }
        Some(edge)
    }

    pub fn edge(&self, triple: &EdgeTriple) -> Option<&Edge> {
        self.edges.get(triple)
    }

    pub fn edge_mut(&mut self, triple: &EdgeTriple) -> Option<&mut Edge> {
        self.edges.get_mut(triple)
    }

    pub fn has_edge(&self, triple: &EdgeTriple) -> bool {
        self.edges.contains_key(triple)
    }

    /// Edges in triple order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    /// Edges leaving `hub`, in insertion order.
    pub fn outgoing<'a>(&'a self, hub: &HubId) -> impl Iterator<Item = &'a Edge> + use<'a> {
        self.adjacency
            .get(hub)
            .into_iter()
            .flatten()
            .filter_map(|t| self.edges.get(t))
    }

    /// Whether a non-transfer edge connects `a` and `b` in either direction.
    pub fn has_direct_line(&self, a: &HubId, b: &HubId) -> bool {
        let direct = |from: &HubId, to: &HubId| {
            self.outgoing(from)
                .any(|e| &e.target == to && !e.is_transfer())
        };
        direct(a, b) || direct(b, a)
    }

    /// Keep only edges matching `keep`, returning how many were removed.
    pub fn retain_edges(&mut self, mut keep: impl FnMut(&Edge) -> bool) -> usize {
        let doomed: Vec<EdgeTriple> = self
            .edges
            .iter()
            .filter(|(_, e)| !keep(e))
            .map(|(t, _)| t.clone())
            .collect();
        for triple in &doomed {
            self.remove_edge(triple);
        }
        doomed.len()
    }

    /// Edges still waiting for a weight.
    pub fn unresolved_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| e.weight.is_none())
    }

    /// Whether any edge uses `key` between two hubs, in either direction.
    pub fn has_key_between(&self, a: &HubId, b: &HubId, key: &EdgeKey) -> bool {
        let forward = EdgeTriple::new(a.clone(), b.clone(), key.clone());
        self.has_edge(&forward) || self.has_edge(&forward.reversed())
    }
}
