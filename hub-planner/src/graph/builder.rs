//! Hub graph construction from route sequences.
//!
//! Every stop is folded into the hub it belongs to (its parent grouping if
//! it has one, else itself), and consecutive stops on a sequence become a
//! directed, unweighted line edge between their hubs.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use tracing::{debug, info, trace};

use crate::domain::{Edge, HubId, LineId, StationId};
use crate::report::{IssueKind, StageReport};
use crate::source::{LineSource, RouteSequence, StopRecord};

use super::model::HubGraph;

/// Result of the construction stage.
#[derive(Debug)]
pub struct BuildOutcome {
    pub graph: HubGraph,
    /// First stop of every sequence, per line. Timetables are fetched from
    /// these.
    pub terminals: BTreeMap<LineId, BTreeSet<StationId>>,
    pub report: StageReport,
}

/// Incremental hub graph builder.
#[derive(Debug)]
pub struct HubGraphBuilder {
    graph: HubGraph,
    terminals: BTreeMap<LineId, BTreeSet<StationId>>,
    report: StageReport,
    added: usize,
    duplicates: usize,
}

impl Default for HubGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HubGraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: HubGraph::new(),
            terminals: BTreeMap::new(),
            report: StageReport::new("build"),
            added: 0,
            duplicates: 0,
        }
    }

    /// Record a line whose sequences could not be fetched.
    pub fn record_failed_line(&mut self, line: &LineId, error: impl std::fmt::Display) {
        self.report.record(
            IssueKind::ExternalCallFailure,
            format!("route sequences for {line}: {error}"),
        );
    }

    /// Fold one direction/branch of a line into the graph.
    ///
    /// Unusable stops are skipped, so their neighbours become consecutive.
    pub fn add_sequence(&mut self, seq: &RouteSequence) {
        let mut previous: Option<HubId> = None;
        let mut first_station = true;

        for stop in &seq.stops {
            let Some((hub_id, station)) = self.register_stop(stop, seq) else {
                continue;
            };
            if first_station {
                self.terminals
                    .entry(seq.line.clone())
                    .or_default()
                    .insert(station);
                first_station = false;
            }

            if let Some(prev) = previous.as_ref().filter(|p| **p != hub_id) {
                let edge = Edge::line(
                    prev.clone(),
                    hub_id.clone(),
                    seq.line.clone(),
                    seq.mode.clone(),
                )
                .with_route_info(seq.direction.clone(), seq.branch);

                match self.graph.add_edge(edge) {
                    Ok(true) => self.added += 1,
                    Ok(false) => {
                        trace!(line = %seq.line, from = %prev, to = %hub_id, "Duplicate line edge");
                        self.duplicates += 1;
                    }
                    Err(e) => self.report.record(IssueKind::DataGap, e.to_string()),
                }
            }
            previous = Some(hub_id);
        }
    }

    /// Upsert the hub owning `stop` and register the stop as a constituent.
    fn register_stop(&mut self, stop: &StopRecord, seq: &RouteSequence) -> Option<(HubId, StationId)> {
        let Some(key) = stop.hub_key() else {
            self.report.record(
                IssueKind::DataGap,
                format!("stop {:?} on {} has no identifier", stop.name, seq.line),
            );
            return None;
        };
        let ids = HubId::parse(key).and_then(|hub| Ok((hub, StationId::parse(stop.id.trim())?)));
        let (hub_id, station) = match ids {
            Ok(ids) => ids,
            Err(e) => {
                self.report
                    .record(IssueKind::DataGap, format!("stop on {}: {e}", seq.line));
                return None;
            }
        };

        if let Some(existing) = self.graph.station_owner(&station) {
            if *existing != hub_id {
                self.report.record(
                    IssueKind::DataGap,
                    format!("station {station} is listed under {existing} and {hub_id}"),
                );
                return None;
            }
        }

        let hub = self.graph.upsert_hub(hub_id.clone(), &stop.name, stop.lat, stop.lon);
        hub.lines.insert(seq.line.clone());
        hub.modes.insert(seq.mode.clone());
        hub.modes.extend(stop.modes.iter().cloned());

        match self.graph.add_station(&hub_id, station.clone(), &stop.name) {
            Ok(_) => Some((hub_id, station)),
            Err(e) => {
                self.report.record(IssueKind::DataGap, e.to_string());
                None
            }
        }
    }

    pub fn finish(self) -> BuildOutcome {
        info!(
            hubs = self.graph.node_count(),
            edges = self.added,
            duplicates = self.duplicates,
            "Hub graph constructed"
        );
        BuildOutcome {
            graph: self.graph,
            terminals: self.terminals,
            report: self.report,
        }
    }
}

/// Fetch the route sequences of `lines` and build the hub graph.
///
/// Lines are fetched in batches of `batch_size`. A line whose fetch fails
/// contributes no edges and is reported; the build carries on. Sequences
/// are folded in line order, so the result does not depend on response
/// timing.
pub async fn build_from_source<S: LineSource>(
    source: &S,
    lines: &[LineId],
    batch_size: usize,
) -> BuildOutcome {
    let mut builder = HubGraphBuilder::new();

    for chunk in lines.chunks(batch_size.max(1)) {
        let futures = chunk.iter().map(|line| async move {
            let result = source.route_sequences(line).await;
            (line, result)
        });

        for (line, result) in join_all(futures).await {
            match result {
                Ok(sequences) => {
                    debug!(line = %line, sequences = sequences.len(), "Fetched route sequences");
                    for seq in &sequences {
                        builder.add_sequence(seq);
                    }
                }
                Err(e) => builder.record_failed_line(line, e),
            }
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeKey, EdgeTriple, Mode};
    use crate::source::{FixtureNetwork, FixtureSource};

    fn stop(id: &str, parent: Option<&str>) -> StopRecord {
        StopRecord {
            id: id.to_string(),
            parent_id: parent.map(String::from),
            name: format!("{id} Station"),
            lat: 51.5,
            lon: -0.1,
            modes: vec![Mode::parse("tube").unwrap()],
        }
    }

    fn sequence(line: &str, stops: Vec<StopRecord>) -> RouteSequence {
        RouteSequence {
            line: LineId::parse(line).unwrap(),
            mode: Mode::parse("tube").unwrap(),
            direction: Some("outbound".into()),
            branch: Some(0),
            stops,
        }
    }

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn triple(a: &str, b: &str, line: &str) -> EdgeTriple {
        EdgeTriple::new(hub(a), hub(b), EdgeKey::Line(LineId::parse(line).unwrap()))
    }

    #[test]
    fn consecutive_stops_become_line_edges() {
        let mut builder = HubGraphBuilder::new();
        builder.add_sequence(&sequence(
            "L1",
            vec![stop("A", None), stop("B", None), stop("C", None)],
        ));
        let outcome = builder.finish();

        assert_eq!(outcome.graph.node_count(), 3);
        assert_eq!(outcome.graph.edge_count(), 2);
        assert!(outcome.graph.has_edge(&triple("A", "B", "L1")));
        assert!(outcome.graph.has_edge(&triple("B", "C", "L1")));
        assert!(!outcome.graph.has_edge(&triple("B", "A", "L1")));
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn grouped_stops_share_a_hub_and_skip_self_edges() {
        let mut builder = HubGraphBuilder::new();
        builder.add_sequence(&sequence(
            "L1",
            vec![
                stop("A", None),
                stop("940K1", Some("HUBK")),
                stop("940K2", Some("HUBK")),
                stop("C", None),
            ],
        ));
        let outcome = builder.finish();
        let graph = &outcome.graph;

        assert_eq!(graph.node_count(), 3);
        assert!(graph.has_edge(&triple("A", "HUBK", "L1")));
        assert!(graph.has_edge(&triple("HUBK", "C", "L1")));
        assert_eq!(graph.hub(&hub("HUBK")).unwrap().constituents.len(), 2);
        assert_eq!(
            graph.hub_for_station(&StationId::parse("940K2").unwrap()),
            Some(&hub("HUBK"))
        );
    }

    #[test]
    fn hub_lines_are_the_union_over_sequences() {
        let mut builder = HubGraphBuilder::new();
        builder.add_sequence(&sequence("L1", vec![stop("A", None), stop("B", None)]));
        builder.add_sequence(&sequence("L2", vec![stop("B", None), stop("C", None)]));
        let outcome = builder.finish();

        let b = outcome.graph.hub(&hub("B")).unwrap();
        assert_eq!(b.lines.len(), 2);
        assert_eq!(outcome.terminals.len(), 2);
        assert!(outcome.terminals[&LineId::parse("L2").unwrap()]
            .contains(&StationId::parse("B").unwrap()));
    }

    #[test]
    fn duplicate_sequences_do_not_duplicate_edges() {
        let mut builder = HubGraphBuilder::new();
        let seq = sequence("L1", vec![stop("A", None), stop("B", None)]);
        builder.add_sequence(&seq);
        builder.add_sequence(&seq);
        assert_eq!(builder.finish().graph.edge_count(), 1);
    }

    #[test]
    fn stops_without_identifier_are_skipped() {
        let mut builder = HubGraphBuilder::new();
        builder.add_sequence(&sequence(
            "L1",
            vec![stop("A", None), stop("", None), stop("C", None)],
        ));
        let outcome = builder.finish();

        assert_eq!(outcome.report.count(IssueKind::DataGap), 1);
        assert!(outcome.graph.has_edge(&triple("A", "C", "L1")));
    }

    #[test]
    fn station_with_two_parents_is_a_gap() {
        let mut builder = HubGraphBuilder::new();
        builder.add_sequence(&sequence("L1", vec![stop("X", Some("HUB1")), stop("B", None)]));
        builder.add_sequence(&sequence("L2", vec![stop("X", Some("HUB2")), stop("C", None)]));
        let outcome = builder.finish();

        assert_eq!(outcome.report.count(IssueKind::DataGap), 1);
        assert_eq!(
            outcome
                .graph
                .hub_for_station(&StationId::parse("X").unwrap()),
            Some(&hub("HUB1"))
        );
    }

    #[tokio::test]
    async fn failed_line_is_reported_and_build_continues() {
        let network = FixtureNetwork {
            sequences: vec![
                sequence("L1", vec![stop("A", None), stop("B", None)]),
                sequence("L2", vec![stop("B", None), stop("C", None)]),
            ],
            ..Default::default()
        };
        let source = FixtureSource::from_network(network)
            .with_failing_line(LineId::parse("L2").unwrap());
        let lines = vec![LineId::parse("L1").unwrap(), LineId::parse("L2").unwrap()];

        let outcome = build_from_source(&source, &lines, 1).await;

        assert_eq!(outcome.graph.edge_count(), 1);
        assert_eq!(outcome.report.count(IssueKind::ExternalCallFailure), 1);
    }
}
