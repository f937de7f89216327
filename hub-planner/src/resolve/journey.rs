//! Line weights from point-to-point journey queries.
//!
//! Used for line edges the timetables could not resolve. Each edge is
//! queried once between its hubs' representative stations; only direct,
//! single-leg itineraries on the edge's own line count as observations.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, info};

use crate::domain::{EdgeKind, EdgeTriple, LineId, Minutes, Mode, StationId};
use crate::graph::HubGraph;
use crate::report::{IssueKind, StageReport};
use crate::source::{Itinerary, JourneySource, ModeFilter};

use super::reconcile::ReconcilePolicy;
use super::store::ResolvedStore;
use super::ResolverOutcome;

/// One edge to query.
struct Query {
    triple: EdgeTriple,
    line: LineId,
    mode: Mode,
    from: StationId,
    to: StationId,
}

/// Durations of the direct legs on `line`.
fn direct_durations(itineraries: &[Itinerary], line: &LineId) -> Vec<f64> {
    itineraries
        .iter()
        .filter_map(Itinerary::direct_leg)
        .filter(|leg| leg.line.as_ref() == Some(line))
        .map(|leg| leg.duration_mins)
        .collect()
}

/// Resolve `pending` line edges with journey queries.
///
/// Edges already in `store` are taken from it without a query. New weights
/// are added to `store`; edges with no qualifying itinerary stay unresolved
/// and are retried on a later run.
pub async fn resolve_journeys<S: JourneySource>(
    graph: &HubGraph,
    pending: &[EdgeTriple],
    source: &S,
    store: &mut ResolvedStore,
    policy: &ReconcilePolicy,
    batch_size: usize,
) -> ResolverOutcome {
    let mut report = StageReport::new("journey");
    let mut weights: BTreeMap<EdgeTriple, Minutes> = BTreeMap::new();
    let mut queries = Vec::new();

    for triple in pending {
        if let Some(stored) = store.get(triple) {
            weights.insert(triple.clone(), stored);
            continue;
        }
        let Some(edge) = graph.edge(triple) else {
            report.record(IssueKind::DataGap, format!("{triple}: not in the graph"));
            continue;
        };
        let EdgeKind::Line { line, mode, .. } = &edge.kind else {
            continue;
        };
        let endpoints = graph
            .hub(&triple.source)
            .and_then(|h| h.representative_station())
            .zip(
                graph
                    .hub(&triple.target)
                    .and_then(|h| h.representative_station()),
            );
        let Some((from, to)) = endpoints else {
            report.record(
                IssueKind::DataGap,
                format!("{triple}: no representative station"),
            );
            continue;
        };
        queries.push(Query {
            triple: triple.clone(),
            line: line.clone(),
            mode: mode.clone(),
            from,
            to,
        });
    }
    let reused = weights.len();

    for chunk in queries.chunks(batch_size.max(1)) {
        let futures = chunk.iter().map(|q| async move {
            let filter = ModeFilter::Modes(vec![q.mode.clone()]);
            (q, source.journeys(&q.from, &q.to, &filter).await)
        });

        for (query, result) in join_all(futures).await {
            let itineraries = match result {
                Ok(itineraries) => itineraries,
                Err(e) => {
                    report.record(
                        IssueKind::ExternalCallFailure,
                        format!("journey {} -> {}: {e}", query.from, query.to),
                    );
                    continue;
                }
            };

            let durations = direct_durations(&itineraries, &query.line);
            let Some(reconciled) = policy.reconcile(&durations) else {
                report.record(
                    IssueKind::DataGap,
                    format!("{}: no direct itinerary on {}", query.triple, query.line),
                );
                continue;
            };
            if reconciled.discrepant {
                report.record(
                    IssueKind::ReconciliationDiscrepancy,
                    format!(
                        "{}: {} itineraries spread {:.1} min",
                        query.triple, reconciled.observations, reconciled.spread
                    ),
                );
            }
            debug!(edge = %query.triple, weight = %reconciled.minutes, "Resolved by journey query");
            store.insert(
                query.triple.clone(),
                reconciled.minutes,
                reconciled.observations,
            );
            weights.insert(query.triple.clone(), reconciled.minutes);
        }
    }

    info!(
        pending = pending.len(),
        reused,
        queried = queries.len(),
        resolved = weights.len(),
        "Journey resolution finished"
    );
    ResolverOutcome {
        weights,
        queried: queries.len(),
        report,
    }
}
