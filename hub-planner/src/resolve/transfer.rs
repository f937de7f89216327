//! Walking durations for transfer pairs.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, info};

use crate::domain::{EdgeKey, EdgeTriple, Minutes, StationId};
use crate::graph::{HubGraph, TransferCandidate};
use crate::report::{IssueKind, StageReport};
use crate::source::{JourneySource, ModeFilter};

use super::reconcile::ReconcilePolicy;
use super::store::ResolvedStore;
use super::ResolverOutcome;

/// Resolve both directions of each transfer pair with one walking query.
///
/// The walk from `a` to `b` is taken as the weight in both directions. A
/// pair that cannot be resolved is left unweighted; that is not an error.
pub async fn resolve_transfers<S: JourneySource>(
    graph: &HubGraph,
    candidates: &[TransferCandidate],
    source: &S,
    store: &mut ResolvedStore,
    policy: &ReconcilePolicy,
    batch_size: usize,
) -> ResolverOutcome {
    let mut report = StageReport::new("transfer");
    let mut weights: BTreeMap<EdgeTriple, Minutes> = BTreeMap::new();
    let mut queries: Vec<(EdgeTriple, StationId, StationId)> = Vec::new();

    for pair in candidates {
        let forward = EdgeTriple::new(pair.a.clone(), pair.b.clone(), EdgeKey::Transfer);
        if !graph.has_edge(&forward) || !graph.has_edge(&forward.reversed()) {
            debug!(a = %pair.a, b = %pair.b, "Transfer pair no longer in the graph");
            continue;
        }
        if let Some(stored) = store.get(&forward) {
            weights.insert(forward.reversed(), stored);
            weights.insert(forward, stored);
            continue;
        }
        let from = graph.hub(&pair.a).and_then(|h| h.representative_station());
        let to = graph.hub(&pair.b).and_then(|h| h.representative_station());
        match from.zip(to) {
            Some((from, to)) => queries.push((forward, from, to)),
            None => report.record(
                IssueKind::DataGap,
                format!("transfer {} <-> {}: no representative station", pair.a, pair.b),
            ),
        }
    }

    for chunk in queries.chunks(batch_size.max(1)) {
        let futures = chunk.iter().map(|(triple, from, to)| async move {
            let result = source.journeys(from, to, &ModeFilter::WalkingOnly).await;
            (triple, result)
        });

        for (forward, result) in join_all(futures).await {
            let itineraries = match result {
                Ok(itineraries) => itineraries,
                Err(e) => {
                    report.record(IssueKind::ExternalCallFailure, format!("walk {forward}: {e}"));
                    continue;
                }
            };
            let durations: Vec<f64> = itineraries
                .iter()
                .filter(|it| it.is_walk_only())
                .map(|it| it.duration_mins)
                .collect();
            let Some(reconciled) = policy.reconcile(&durations) else {
                report.record(IssueKind::DataGap, format!("walk {forward}: no walking route"));
                continue;
            };
            if reconciled.discrepant {
                report.record(
                    IssueKind::ReconciliationDiscrepancy,
                    format!("walk {forward}: spread {:.1} min", reconciled.spread),
                );
            }

            let minutes = reconciled.minutes;
            for triple in [forward.clone(), forward.reversed()] {
                store.insert(triple.clone(), minutes, reconciled.observations);
                weights.insert(triple, minutes);
            }
        }
    }

    info!(
        candidates = candidates.len(),
        queried = queries.len(),
        resolved_pairs = weights.len() / 2,
        "Transfer resolution finished"
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
    use crate::domain::{Edge, HubId, Mode};
    use crate::source::{FixtureNetwork, FixtureSource, Itinerary, JourneyFixture, JourneyLeg};

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn station(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    fn graph() -> HubGraph {
        let mut g = HubGraph::new();
        for id in ["A", "B", "C"] {
            g.upsert_hub(hub(id), id, 51.5, -0.1);
            g.add_station(&hub(id), station(id), id).unwrap();
        }
        for (x, y) in [("A", "B"), ("B", "A"), ("B", "C"), ("C", "B")] {
            g.add_edge(Edge::transfer(hub(x), hub(y))).unwrap();
        }
        g
    }

    fn walk(minutes: f64) -> Itinerary {
        Itinerary {
            duration_mins: minutes,
            legs: vec![JourneyLeg {
                mode: Mode::walking(),
                line: None,
                duration_mins: minutes,
                is_walking: true,
            }],
        }
    }

    fn policy() -> ReconcilePolicy {
        ReconcilePolicy::new(Minutes::new(1.0).unwrap())
    }

    #[tokio::test]
    async fn one_query_weights_both_directions() {
        let source = FixtureSource::from_network(FixtureNetwork {
            journeys: vec![JourneyFixture {
                from: station("A"),
                to: station("B"),
                walking: true,
                itineraries: vec![walk(4.0)],
            }],
            ..Default::default()
        });
        let candidates = vec![
            TransferCandidate::new(hub("A"), hub("B")),
            TransferCandidate::new(hub("B"), hub("C")),
        ];
        let mut store = ResolvedStore::in_memory();

        let outcome =
            resolve_transfers(&graph(), &candidates, &source, &mut store, &policy(), 4).await;

        let ab = EdgeTriple::new(hub("A"), hub("B"), EdgeKey::Transfer);
        assert_eq!(outcome.weights[&ab].get(), 4.0);
        assert_eq!(outcome.weights[&ab.reversed()].get(), 4.0);
        assert_eq!(outcome.weights.len(), 2);
        assert_eq!(source.journey_calls(), 2);
        // B <-> C had no walking route and stays unresolved.
        assert_eq!(outcome.report.count(IssueKind::DataGap), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn stored_pairs_skip_the_query() {
        let source = FixtureSource::from_network(FixtureNetwork::default());
        let ab = EdgeTriple::new(hub("A"), hub("B"), EdgeKey::Transfer);
        let mut store = ResolvedStore::in_memory();
        store.insert(ab.clone(), Minutes::new(5.0).unwrap(), 1);

        let outcome = resolve_transfers(
            &graph(),
            &[TransferCandidate::new(hub("B"), hub("A"))],
            &source,
            &mut store,
            &policy(),
            4,
        )
        .await;

        assert_eq!(source.journey_calls(), 0);
        assert_eq!(outcome.weights[&ab.reversed()].get(), 5.0);
    }
}
