//! Walking transfers between nearby hubs.
//!
//! Hubs that are a short walk apart but share no line get a pair of
//! unresolved `transfer` edges. Their durations are filled in later by the
//! transfer-weight resolver.

use std::collections::{BTreeSet, HashSet};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::domain::{Edge, EdgeKey, HubId, Mode, StationId};
use crate::report::{IssueKind, StageReport};
use crate::source::{NearbySource, StopRecord};

use super::model::HubGraph;

/// Configuration for the proximity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Walking radius around each hub, in metres.
    pub radius_m: f64,
    /// Modes whose stops may be added to the graph as new hubs.
    pub core_modes: BTreeSet<Mode>,
    /// Concurrent nearby queries per batch.
    pub batch_size: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        let core_modes = ["tube", "dlr", "overground", "elizabeth-line"]
            .into_iter()
            .filter_map(|m| Mode::parse(m).ok())
            .collect();
        Self {
            radius_m: 250.0,
            core_modes,
            batch_size: 8,
        }
    }
}

/// An unordered pair of hubs that needs a walking duration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransferCandidate {
    pub a: HubId,
    pub b: HubId,
}

impl TransferCandidate {
    /// The pair in canonical order.
    pub fn new(x: HubId, y: HubId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

/// Result of the proximity stage.
#[derive(Debug)]
pub struct ProximityOutcome {
    pub candidates: Vec<TransferCandidate>,
    pub hubs_added: usize,
    pub report: StageReport,
}

/// Add transfer edges between hubs within walking distance of each other.
///
/// Only hubs present when the stage starts are searched around. A nearby
/// stop whose hub is not in the graph is added as a new hub when it serves
/// a core mode, and ignored otherwise.
pub async fn augment<S: NearbySource>(
    graph: &mut HubGraph,
    source: &S,
    config: &ProximityConfig,
) -> ProximityOutcome {
    let mut report = StageReport::new("proximity");
    let mut processed: HashSet<TransferCandidate> = HashSet::new();
    let mut candidates = Vec::new();
    let mut hubs_added = 0;

    let mut origins = Vec::new();
    for hub in graph.hubs() {
        if hub.lat.is_finite() && hub.lon.is_finite() {
            origins.push((hub.id.clone(), hub.lat, hub.lon));
        } else {
            report.record(IssueKind::DataGap, format!("hub {} has no coordinates", hub.id));
        }
    }

    for chunk in origins.chunks(config.batch_size.max(1)) {
        let futures = chunk.iter().map(|(id, lat, lon)| async move {
            (id, source.nearby_stops(*lat, *lon, config.radius_m).await)
        });

        for (current, result) in join_all(futures).await {
            let stops = match result {
                Ok(stops) => stops,
                Err(e) => {
                    report.record(
                        IssueKind::ExternalCallFailure,
                        format!("nearby stops for {current}: {e}"),
                    );
                    continue;
                }
            };

            for stop in &stops {
                let Some(nearby) = owning_hub(graph, stop, config, &mut report, &mut hubs_added)
                else {
                    continue;
                };
                if &nearby == current {
                    continue;
                }
                let pair = TransferCandidate::new(current.clone(), nearby.clone());
                if !processed.insert(pair.clone()) {
                    continue;
                }
                if graph.has_direct_line(current, &nearby)
                    || graph.has_key_between(current, &nearby, &EdgeKey::Transfer)
                {
                    trace!(from = %current, to = %nearby, "Already connected");
                    continue;
                }

                let forward = graph.add_edge(Edge::transfer(current.clone(), nearby.clone()));
                let backward = graph.add_edge(Edge::transfer(nearby.clone(), current.clone()));
                if let Err(e) = forward.and(backward) {
                    report.record(IssueKind::DataGap, e.to_string());
                    continue;
                }
                debug!(a = %pair.a, b = %pair.b, "Added transfer pair");
                candidates.push(pair);
            }
        }
    }

    info!(
        candidates = candidates.len(),
        hubs_added, "Proximity transfers added"
    );
    ProximityOutcome {
        candidates,
        hubs_added,
        report,
    }
}

/// The graph hub a nearby stop belongs to, adding it if it qualifies.
fn owning_hub(
    graph: &mut HubGraph,
    stop: &StopRecord,
    config: &ProximityConfig,
    report: &mut StageReport,
    hubs_added: &mut usize,
) -> Option<HubId> {
    let station = StationId::parse(stop.id.trim()).ok();
    if let Some(owner) = station.as_ref().and_then(|s| graph.station_owner(s)) {
        return Some(owner.clone());
    }

    let Some(key) = stop.hub_key() else {
        report.record(
            IssueKind::DataGap,
            format!("nearby stop {:?} has no identifier", stop.name),
        );
        return None;
    };
    let hub_id = match HubId::parse(key) {
        Ok(id) => id,
        Err(e) => {
            report.record(IssueKind::DataGap, e.to_string());
            return None;
        }
    };
    if graph.contains_hub(&hub_id) {
        return Some(hub_id);
    }

    if !stop.modes.iter().any(|m| config.core_modes.contains(m)) {
        trace!(stop = %stop.id, "Ignoring nearby stop outside core modes");
        return None;
    }
    let Some(station) = station else {
        report.record(
            IssueKind::DataGap,
            format!("nearby stop {:?} has an invalid identifier", stop.id),
        );
        return None;
    };

    let hub = graph.upsert_hub(hub_id.clone(), &stop.name, stop.lat, stop.lon);
    hub.modes.extend(stop.modes.iter().cloned());
    if let Err(e) = graph.add_station(&hub_id, station, &stop.name) {
        report.record(IssueKind::DataGap, e.to_string());
    }
    *hubs_added += 1;
    debug!(hub = %hub_id, "Added hub from nearby stop");
    Some(hub_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeTriple, LineId};
    use crate::source::{FixtureNetwork, FixtureSource};

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn stop(id: &str, lat: f64, modes: &[&str]) -> StopRecord {
        StopRecord {
            id: id.to_string(),
            parent_id: None,
            name: id.to_string(),
            lat,
            lon: -0.1,
            modes: modes.iter().map(|m| Mode::parse(*m).unwrap()).collect(),
        }
    }

    /// Graph with hubs A and B (about 111 m apart) and C far away, plus a
    /// source that knows their stops.
    fn setup(extra: Vec<StopRecord>) -> (HubGraph, FixtureSource) {
        let mut graph = HubGraph::new();
        let stops = vec![
            stop("A", 51.5000, &["tube"]),
            stop("B", 51.5010, &["tube"]),
            stop("C", 51.6000, &["tube"]),
        ];
        for s in &stops {
            let id = hub(&s.id);
            graph.upsert_hub(id.clone(), &s.name, s.lat, s.lon);
            graph
                .add_station(&id, StationId::parse(s.id.as_str()).unwrap(), &s.name)
                .unwrap();
        }
        let network = FixtureNetwork {
            stops: stops.into_iter().chain(extra).collect(),
            ..Default::default()
        };
        (graph, FixtureSource::from_network(network))
    }

    #[tokio::test]
    async fn nearby_hubs_get_one_transfer_pair() {
        let (mut graph, source) = setup(vec![]);

        let outcome = augment(&mut graph, &source, &ProximityConfig::default()).await;

        assert_eq!(outcome.candidates, vec![TransferCandidate::new(hub("B"), hub("A"))]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge(&EdgeTriple::new(hub("A"), hub("B"), EdgeKey::Transfer)));
        assert!(graph.has_edge(&EdgeTriple::new(hub("B"), hub("A"), EdgeKey::Transfer)));
        assert!(outcome.report.is_clean());
    }

    #[tokio::test]
    async fn line_connected_hubs_are_skipped() {
        let (mut graph, source) = setup(vec![]);
        graph
            .add_edge(Edge::line(
                hub("B"),
                hub("A"),
                LineId::parse("L1").unwrap(),
                Mode::parse("tube").unwrap(),
            ))
            .unwrap();

        let outcome = augment(&mut graph, &source, &ProximityConfig::default()).await;

        assert!(outcome.candidates.is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[tokio::test]
    async fn core_mode_stops_become_hubs() {
        let (mut graph, source) = setup(vec![
            stop("D", 51.4995, &["dlr"]),
            stop("R", 51.5005, &["national-rail"]),
        ]);

        let outcome = augment(&mut graph, &source, &ProximityConfig::default()).await;

        assert_eq!(outcome.hubs_added, 1);
        assert!(graph.contains_hub(&hub("D")));
        assert!(!graph.contains_hub(&hub("R")));
        assert!(outcome
            .candidates
            .contains(&TransferCandidate::new(hub("A"), hub("D"))));
    }

    #[tokio::test]
    async fn non_core_stop_joins_when_its_hub_exists() {
        let (mut graph, source) = setup(vec![StopRecord {
            parent_id: Some("B".into()),
            ..stop("910GB", 51.5012, &["national-rail"])
        }]);

        let outcome = augment(&mut graph, &source, &ProximityConfig::default()).await;

        assert_eq!(outcome.hubs_added, 0);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[test]
    fn candidate_pairs_are_unordered() {
        assert_eq!(
            TransferCandidate::new(hub("X"), hub("Y")),
            TransferCandidate::new(hub("Y"), hub("X"))
        );
    }
}
