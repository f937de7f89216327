//! Minimum journey-time search.
//!
//! A Dijkstra variant over the finalized hub graph. The search state is the
//! pair (hub, key of the edge used to arrive), so the same hub reached on two
//! different lines is tracked separately: the cheaper arrival may be the one
//! that forces a line change further on.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::trace;

use crate::domain::{EdgeKey, HubId, Minutes};
use crate::graph::HubGraph;

use super::config::SearchConfig;

/// Error from journey-time search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// Origin or destination is not a hub in the graph
    #[error("station not found: {0}")]
    StationNotFound(HubId),
}

/// Fastest route between two hubs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Travel time including penalties.
    pub minutes: Minutes,

    /// Hubs visited, origin first.
    pub path: Vec<HubId>,

    /// Key of each edge taken; one shorter than `path`.
    pub keys: Vec<EdgeKey>,

    /// Number of line-to-line changes.
    pub line_changes: usize,

    /// Penalty minutes included in `minutes`.
    pub penalty: Minutes,
}

/// One reached state, stored in an arena so paths can be rebuilt from
/// parent indices.
#[derive(Debug)]
struct Label {
    hub: HubId,
    arrived_by: Option<EdgeKey>,
    time: Minutes,
    penalty: Minutes,
    changes: usize,
    parent: Option<usize>,
}

type State = (HubId, Option<EdgeKey>);

/// Whether moving from an arrival on `previous` onto `next` is a line change.
fn is_line_change(previous: Option<&EdgeKey>, next: &EdgeKey) -> bool {
    match previous {
        Some(prev) => !prev.is_transfer() && !next.is_transfer() && prev != next,
        None => false,
    }
}

/// Read-only search over a finalized graph.
///
/// Holds only shared references, so one instance can serve concurrent
/// queries.
#[derive(Debug, Clone)]
pub struct JourneySearch<'g> {
    graph: &'g HubGraph,
    config: SearchConfig,
}

impl<'g> JourneySearch<'g> {
    pub fn new(graph: &'g HubGraph, config: SearchConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &'g HubGraph {
        self.graph
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Fail with [`SearchError::StationNotFound`] unless `hub` is in the graph.
    pub fn ensure_hub(&self, hub: &HubId) -> Result<(), SearchError> {
        if self.graph.contains_hub(hub) {
            Ok(())
        } else {
            Err(SearchError::StationNotFound(hub.clone()))
        }
    }

    /// Fastest route from `origin` to `destination`.
    ///
    /// Returns `Ok(None)` if the destination cannot be reached over resolved
    /// edges. Unweighted edges are never traversed.
    pub fn search(
        &self,
        origin: &HubId,
        destination: &HubId,
    ) -> Result<Option<SearchOutcome>, SearchError> {
        self.ensure_hub(origin)?;
        self.ensure_hub(destination)?;

        if origin == destination {
            return Ok(Some(SearchOutcome {
                minutes: Minutes::ZERO,
                path: vec![origin.clone()],
                keys: Vec::new(),
                line_changes: 0,
                penalty: Minutes::ZERO,
            }));
        }

        let penalty_step = self.config.transfer_penalty();
        let mut labels = vec![Label {
            hub: origin.clone(),
            arrived_by: None,
            time: Minutes::ZERO,
            penalty: Minutes::ZERO,
            changes: 0,
            parent: None,
        }];
        let mut best: HashMap<State, Minutes> = HashMap::from([((origin.clone(), None), Minutes::ZERO)]);
        // (time, arena index); the index doubles as a FIFO tie-break.
        let mut frontier = BinaryHeap::from([Reverse((Minutes::ZERO, 0usize))]);
        let mut found: Option<usize> = None;
        let mut popped = 0usize;

        while let Some(Reverse((time, index))) = frontier.pop() {
            if let Some(done) = found
                && time >= labels[done].time
            {
                break;
            }
            let state = (labels[index].hub.clone(), labels[index].arrived_by.clone());
            if best.get(&state).is_some_and(|b| time > *b) {
                continue;
            }
            popped += 1;

            for edge in self.graph.outgoing(&state.0) {
                let Some(weight) = edge.weight else {
                    continue;
                };
                let key = edge.key();
                let change = is_line_change(state.1.as_ref(), &key);
                let step = if change { penalty_step } else { Minutes::ZERO };
                let arrival = time + weight + step;

                if let Some(done) = found
                    && arrival >= labels[done].time
                {
                    continue;
                }
                let next: State = (edge.target.clone(), Some(key));
                if best.get(&next).is_some_and(|b| arrival >= *b) {
                    continue;
                }

                let label = Label {
                    hub: edge.target.clone(),
                    arrived_by: next.1.clone(),
                    time: arrival,
                    penalty: labels[index].penalty + step,
                    changes: labels[index].changes + usize::from(change),
                    parent: Some(index),
                };
                labels.push(label);
                let new_index = labels.len() - 1;
                best.insert(next, arrival);
                if edge.target == *destination {
                    found = Some(new_index);
                }
                frontier.push(Reverse((arrival, new_index)));
            }
        }

        trace!(%origin, %destination, popped, labels = labels.len(), "Search finished");
        Ok(found.map(|index| Self::rebuild(&labels, index)))
    }

    /// Minutes of the fastest route, if any.
    pub fn journey_time(
        &self,
        origin: &HubId,
        destination: &HubId,
    ) -> Result<Option<Minutes>, SearchError> {
        Ok(self.search(origin, destination)?.map(|o| o.minutes))
    }

    fn rebuild(labels: &[Label], end: usize) -> SearchOutcome {
        let mut path = Vec::new();
        let mut keys = Vec::new();
        let mut cursor = Some(end);
        while let Some(index) = cursor {
            let label = &labels[index];
            path.push(label.hub.clone());
            if let Some(key) = &label.arrived_by {
                keys.push(key.clone());
            }
            cursor = label.parent;
        }
        path.reverse();
        keys.reverse();

        let last = &labels[end];
        SearchOutcome {
            minutes: last.time,
            path,
            keys,
            line_changes: last.changes,
            penalty: last.penalty,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{Edge, LineId, Mode};
    use proptest::prelude::*;

    fn hub(i: usize) -> HubId {
        HubId::parse(format!("H{i:02}")).unwrap()
    }

    fn weighted(mut edge: Edge, minutes: f64) -> Edge {
        edge.weight = Some(Minutes::new(minutes).unwrap());
        edge
    }

    /// A bidirectional chain where segment `i` runs on line `lines[i]`.
    fn chain(weights: &[u8], lines: &[u8]) -> HubGraph {
        let mut g = HubGraph::new();
        for i in 0..=weights.len() {
            g.upsert_hub(hub(i), &format!("Hub {i}"), 51.5, -0.1);
        }
        let tube = Mode::parse("tube").unwrap();
        for (i, (w, l)) in weights.iter().zip(lines).enumerate() {
            let line = LineId::parse(format!("L{l}")).unwrap();
            for (a, b) in [(i, i + 1), (i + 1, i)] {
                let edge = Edge::line(hub(a), hub(b), line.clone(), tube.clone());
                g.add_edge(weighted(edge, f64::from(*w))).unwrap();
            }
        }
        g
    }

    fn chain_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
        (2usize..7).prop_flat_map(|n| {
            (
                prop::collection::vec(1u8..20, n),
                prop::collection::vec(0u8..3, n),
            )
        })
    }

    fn all_pairs(g: &HubGraph, n: usize) -> Vec<Option<Minutes>> {
        let search = JourneySearch::new(g, SearchConfig::default());
        let mut out = Vec::new();
        for a in 0..n {
            for b in 0..n {
                out.push(search.journey_time(&hub(a), &hub(b)).unwrap());
            }
        }
        out
    }

    proptest! {
        #[test]
        fn long_detour_never_changes_minima((weights, lines) in chain_strategy()) {
            let g = chain(&weights, &lines);
            let n = weights.len() + 1;
            let before = all_pairs(&g, n);

            // A detour hub reachable from both ends, far slower than the chain.
            let detour_cost: f64 = weights.iter().map(|w| f64::from(*w)).sum::<f64>() + 100.0;
            let mut with_detour = g.clone();
            let detour = HubId::parse("DETOUR").unwrap();
            with_detour.upsert_hub(detour.clone(), "Detour", 51.5, -0.1);
            let line = LineId::parse("LX").unwrap();
            let tube = Mode::parse("tube").unwrap();
            for end in [hub(0), hub(n - 1)] {
                for (a, b) in [(end.clone(), detour.clone()), (detour.clone(), end.clone())] {
                    let edge = Edge::line(a, b, line.clone(), tube.clone());
                    with_detour.add_edge(weighted(edge, detour_cost)).unwrap();
                }
            }

            prop_assert_eq!(before, all_pairs(&with_detour, n));
        }

        #[test]
        fn minutes_are_weights_plus_penalty((weights, lines) in chain_strategy()) {
            let g = chain(&weights, &lines);
            let n = weights.len() + 1;
            let search = JourneySearch::new(&g, SearchConfig::default());

            let outcome = search.search(&hub(0), &hub(n - 1)).unwrap().unwrap();

            let mut total = outcome.penalty;
            for (pair, key) in outcome.path.windows(2).zip(&outcome.keys) {
                let triple = crate::domain::EdgeTriple::new(pair[0].clone(), pair[1].clone(), key.clone());
                total = total + g.edge(&triple).and_then(|e| e.weight).unwrap();
            }
            prop_assert_eq!(outcome.minutes, total);
            prop_assert_eq!(outcome.keys.len() + 1, outcome.path.len());
            prop_assert_eq!(
                outcome.penalty.get(),
                5.0 * outcome.line_changes as f64
            );
        }

        #[test]
        fn forward_chain_time_matches_direct_sum((weights, lines) in chain_strategy()) {
            let g = chain(&weights, &lines);
            let n = weights.len() + 1;
            let changes = lines.windows(2).filter(|w| w[0] != w[1]).count();
            let expected: f64 =
                weights.iter().map(|w| f64::from(*w)).sum::<f64>() + 5.0 * changes as f64;

            let time = JourneySearch::new(&g, SearchConfig::default())
                .journey_time(&hub(0), &hub(n - 1))
                .unwrap()
                .unwrap();

            prop_assert_eq!(time.get(), expected);
        }
    }
}
