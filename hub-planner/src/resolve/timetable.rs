//! Line weights from scheduled intervals.
//!
//! A timetable lists, for each departure pattern from a terminal, the
//! cumulative minutes at which each following stop is reached. Walking a
//! pattern yields one observation per hub change that matches a line edge.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use tracing::{debug, info, trace};

use crate::domain::{EdgeKey, EdgeTriple, HubId, LineId, Mode, StationId};
use crate::graph::HubGraph;
use crate::report::{IssueKind, StageReport};
use crate::source::{IntervalSequence, IntervalSource};

use super::observation::{DurationObservation, ObservationSet};
use super::reconcile::ReconcilePolicy;
use super::ResolverOutcome;

/// Counts from walking interval sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub observed: usize,
    /// Hub changes with no matching line edge.
    pub discarded: usize,
}

/// Walk one interval sequence of `line` and collect observations.
///
/// Consecutive stops at the same hub only move the anchor forward in time.
/// A malformed point, or a stop the graph does not know, drops the anchor so
/// no observation spans the gap.
pub fn observe_sequence(
    graph: &HubGraph,
    line: &LineId,
    sequence: &IntervalSequence,
    context: &str,
    observations: &mut ObservationSet,
    report: &mut StageReport,
) -> WalkStats {
    let key = EdgeKey::Line(line.clone());
    let mut stats = WalkStats::default();
    let mut anchor: Option<(HubId, f64)> = None;

    for (index, point) in sequence.points.iter().enumerate() {
        let Some((stop, minutes)) = point.parts() else {
            report.record(
                IssueKind::DataGap,
                format!("{context}: malformed interval point {index}"),
            );
            anchor = None;
            continue;
        };
        let hub = StationId::parse(stop)
            .ok()
            .and_then(|s| graph.hub_for_station(&s).cloned());
        // An unknown stop resets the anchor like a malformed point: the
        // stops on either side of it are not known to be adjacent.
        let Some(hub) = hub else {
            report.record(
                IssueKind::DataGap,
                format!("{context}: stop {stop} is not in the graph"),
            );
            anchor = None;
            continue;
        };

        if let Some((previous, since)) = &anchor
            && *previous != hub
        {
            let triple = EdgeTriple::new(previous.clone(), hub.clone(), key.clone());
            if graph.has_edge(&triple) {
                observations.push(DurationObservation {
                    source: previous.clone(),
                    target: hub.clone(),
                    key: key.clone(),
                    minutes: minutes - since,
                    context: context.to_string(),
                });
                stats.observed += 1;
            } else {
                trace!(edge = %triple, "No line edge for interval pair");
                stats.discarded += 1;
            }
        }
        anchor = Some((hub, minutes));
    }

    stats
}

/// Lines to resolve from timetables: every line edge whose mode is in
/// `modes`.
pub fn interval_lines(graph: &HubGraph, modes: &BTreeSet<Mode>) -> BTreeSet<LineId> {
    graph
        .edges()
        .filter(|e| e.mode().is_some_and(|m| modes.contains(m)))
        .filter_map(|e| e.key().line().cloned())
        .collect()
}

/// Resolve line weights from the timetables of `lines`.
///
/// One query per (line, terminal), fanned out in batches of `batch_size`.
/// Failed queries are reported and yield no observations.
pub async fn resolve_timetables<S: IntervalSource>(
    graph: &HubGraph,
    lines: &BTreeSet<LineId>,
    terminals: &BTreeMap<LineId, BTreeSet<StationId>>,
    source: &S,
    policy: &ReconcilePolicy,
    batch_size: usize,
) -> ResolverOutcome {
    let mut report = StageReport::new("timetable");
    let mut observations = ObservationSet::new();
    let mut stats = WalkStats::default();

    let mut queries: Vec<(&LineId, &StationId)> = Vec::new();
    for line in lines {
        match terminals.get(line) {
            Some(stations) if !stations.is_empty() => {
                queries.extend(stations.iter().map(|s| (line, s)));
            }
            _ => report.record(IssueKind::DataGap, format!("line {line} has no terminal")),
        }
    }

    for chunk in queries.chunks(batch_size.max(1)) {
        let futures = chunk.iter().map(|(line, terminal)| async move {
            (*line, *terminal, source.intervals(line, terminal).await)
        });

        for (line, terminal, result) in join_all(futures).await {
            let sequences = match result {
                Ok(sequences) => sequences,
                Err(e) => {
                    report.record(
                        IssueKind::ExternalCallFailure,
                        format!("timetable {line} from {terminal}: {e}"),
                    );
                    continue;
                }
            };
            debug!(line = %line, terminal = %terminal, sequences = sequences.len(), "Fetched timetable");
            for (i, sequence) in sequences.iter().enumerate() {
                let context = format!("{line} from {terminal} #{i}");
                let walked =
                    observe_sequence(graph, line, sequence, &context, &mut observations, &mut report);
                stats.observed += walked.observed;
                stats.discarded += walked.discarded;
            }
        }
    }

    let weights = observations.reconcile_all(policy, &mut report);
    info!(
        queries = queries.len(),
        observations = stats.observed,
        discarded = stats.discarded,
        resolved = weights.len(),
        "Timetable resolution finished"
    );
    ResolverOutcome {
        weights,
        queried: queries.len(),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, Minutes};
    use crate::source::{FixtureNetwork, FixtureSource, IntervalFixture, IntervalPoint};

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn l1() -> LineId {
        LineId::parse("L1").unwrap()
    }

    fn triple(a: &str, b: &str) -> EdgeTriple {
        EdgeTriple::new(hub(a), hub(b), EdgeKey::Line(l1()))
    }

    /// A -> HUBK -> C on L1, with HUBK made of stations K1 and K2.
    fn graph() -> HubGraph {
        let mut g = HubGraph::new();
        for (h, stations) in [("A", vec!["A"]), ("HUBK", vec!["K1", "K2"]), ("C", vec!["C"])] {
            g.upsert_hub(hub(h), h, 51.5, -0.1);
            for s in stations {
                g.add_station(&hub(h), StationId::parse(s).unwrap(), s).unwrap();
            }
        }
        let tube = Mode::parse("tube").unwrap();
        g.add_edge(Edge::line(hub("A"), hub("HUBK"), l1(), tube.clone())).unwrap();
        g.add_edge(Edge::line(hub("HUBK"), hub("C"), l1(), tube)).unwrap();
        g
    }

    fn seq(points: Vec<IntervalPoint>) -> IntervalSequence {
        IntervalSequence { points }
    }

    fn walk(sequence: &IntervalSequence) -> (ObservationSet, StageReport, WalkStats) {
        let mut observations = ObservationSet::new();
        let mut report = StageReport::new("test");
        let stats = observe_sequence(&graph(), &l1(), sequence, "test", &mut observations, &mut report);
        (observations, report, stats)
    }

    #[test]
    fn hub_changes_become_observations() {
        let (obs, report, stats) = walk(&seq(vec![
            IntervalPoint::new("A", 0.0),
            IntervalPoint::new("K1", 2.0),
            IntervalPoint::new("C", 5.5),
        ]));

        assert_eq!(stats.observed, 2);
        assert_eq!(obs.values(&triple("A", "HUBK")), vec![2.0]);
        assert_eq!(obs.values(&triple("HUBK", "C")), vec![3.5]);
        assert!(report.is_clean());
    }

    #[test]
    fn same_hub_stops_advance_the_anchor() {
        let (obs, _, _) = walk(&seq(vec![
            IntervalPoint::new("A", 0.0),
            IntervalPoint::new("K1", 2.0),
            IntervalPoint::new("K2", 3.0),
            IntervalPoint::new("C", 5.0),
        ]));

        assert_eq!(obs.values(&triple("HUBK", "C")), vec![2.0]);
    }

    #[test]
    fn malformed_point_breaks_the_chain() {
        let (obs, report, stats) = walk(&seq(vec![
            IntervalPoint::new("A", 0.0),
            IntervalPoint {
                stop_id: Some("K1".into()),
                minutes: None,
            },
            IntervalPoint::new("C", 5.0),
        ]));

        assert_eq!(stats.observed, 0);
        assert!(obs.is_empty());
        assert_eq!(report.count(IssueKind::DataGap), 1);
    }

    #[test]
    fn unknown_stop_breaks_the_chain() {
        let (obs, report, stats) = walk(&seq(vec![
            IntervalPoint::new("A", 0.0),
            IntervalPoint::new("ZZZ", 1.0),
            IntervalPoint::new("K1", 2.0),
            IntervalPoint::new("C", 5.0),
        ]));

        // No A -> HUBK observation across the unknown stop, but the walk
        // picks up again from K1.
        assert_eq!(stats.observed, 1);
        assert!(obs.values(&triple("A", "HUBK")).is_empty());
        assert_eq!(obs.values(&triple("HUBK", "C")), vec![3.0]);
        assert_eq!(report.count(IssueKind::DataGap), 1);
    }

    #[test]
    fn pairs_without_edges_are_discarded() {
        let (obs, _, stats) = walk(&seq(vec![
            IntervalPoint::new("C", 0.0),
            IntervalPoint::new("K1", 3.0),
        ]));

        assert!(obs.is_empty());
        assert_eq!(stats.discarded, 1);
    }

    #[tokio::test]
    async fn resolves_from_every_terminal() {
        let g = graph();
        let network = FixtureNetwork {
            intervals: vec![IntervalFixture {
                line: l1(),
                from: StationId::parse("A").unwrap(),
                sequences: vec![
                    seq(vec![
                        IntervalPoint::new("A", 0.0),
                        IntervalPoint::new("K1", 2.0),
                        IntervalPoint::new("C", 5.0),
                    ]),
                    seq(vec![
                        IntervalPoint::new("A", 0.0),
                        IntervalPoint::new("K1", 2.4),
                        IntervalPoint::new("C", 5.0),
                    ]),
                ],
            }],
            ..Default::default()
        };
        let source = FixtureSource::from_network(network);
        let terminals = BTreeMap::from([(l1(), BTreeSet::from([StationId::parse("A").unwrap()]))]);
        let lines = interval_lines(&g, &BTreeSet::from([Mode::parse("tube").unwrap()]));
        let policy = ReconcilePolicy::new(Minutes::new(0.5).unwrap());

        let outcome = resolve_timetables(&g, &lines, &terminals, &source, &policy, 4).await;

        assert_eq!(outcome.queried, 1);
        assert_eq!(outcome.weights[&triple("A", "HUBK")].get(), 2.2);
        assert_eq!(outcome.weights[&triple("HUBK", "C")].get(), 2.8);
    }

    #[test]
    fn interval_lines_filter_by_mode() {
        let g = graph();
        assert_eq!(
            interval_lines(&g, &BTreeSet::from([Mode::parse("tube").unwrap()])).len(),
            1
        );
        assert!(interval_lines(&g, &BTreeSet::from([Mode::parse("bus").unwrap()])).is_empty());
    }
}
