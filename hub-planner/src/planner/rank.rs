//! Ranking candidate meeting hubs for several travellers.
//!
//! Each candidate is scored by the time every traveller needs to reach it,
//! including the walk to their starting hub. Candidates are ranked by the
//! average of those times, so the best meeting point is fair on average
//! rather than fastest for one person.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{HubId, Minutes};

use super::search::{JourneySearch, SearchError};

/// A person starting from `origin` after `pre_walk` minutes on foot.
#[derive(Debug, Clone, PartialEq)]
pub struct Traveller {
    pub origin: HubId,
    pub pre_walk: Minutes,
}

impl Traveller {
    pub fn new(origin: HubId, pre_walk: Minutes) -> Self {
        Self { origin, pre_walk }
    }
}

/// A candidate every traveller can reach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub hub: HubId,
    pub total: Minutes,
    pub average: Minutes,
    /// Time for each traveller, in input order.
    pub per_origin: Vec<Minutes>,
}

/// Result of ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Best first.
    pub candidates: Vec<RankedCandidate>,
    /// Set when ranking stopped early; `candidates` then only covers those
    /// evaluated before the stop.
    pub cancelled: bool,
}

impl Ranking {
    /// The `k` best candidates.
    pub fn top(&self, k: usize) -> &[RankedCandidate] {
        &self.candidates[..k.min(self.candidates.len())]
    }
}

/// Shared flag for stopping a ranking from another task, with an optional
/// deadline after which it counts as cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that cancels itself once `budget` has elapsed.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(budget),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Rank `candidates` by average journey time across `travellers`.
///
/// A candidate some traveller cannot reach is dropped. Ties on the average
/// are broken by hub id. Every origin and candidate must exist in the graph.
///
/// The token is checked between candidates; on cancellation the candidates
/// evaluated so far are ranked and returned with `cancelled` set.
pub fn rank_candidates(
    search: &JourneySearch<'_>,
    travellers: &[Traveller],
    candidates: &[HubId],
    cancel: &CancelToken,
) -> Result<Ranking, SearchError> {
    rank_with(search, travellers, candidates, cancel, |_| {})
}

/// `rank_candidates`, calling `on_scored` after each reachable candidate.
fn rank_with(
    search: &JourneySearch<'_>,
    travellers: &[Traveller],
    candidates: &[HubId],
    cancel: &CancelToken,
    mut on_scored: impl FnMut(&RankedCandidate),
) -> Result<Ranking, SearchError> {
    for hub in travellers.iter().map(|t| &t.origin).chain(candidates) {
        search.ensure_hub(hub)?;
    }
    if travellers.is_empty() {
        return Ok(Ranking::default());
    }

    let mut ranked = Vec::new();
    let mut cancelled = false;
    let mut unreachable = 0usize;

    'candidates: for candidate in candidates {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let mut per_origin = Vec::with_capacity(travellers.len());
        for traveller in travellers {
            let Some(time) = search.journey_time(&traveller.origin, candidate)? else {
                debug!(candidate = %candidate, origin = %traveller.origin, "Candidate unreachable");
                unreachable += 1;
                continue 'candidates;
            };
            per_origin.push(traveller.pre_walk + time);
        }

        let total = per_origin.iter().fold(Minutes::ZERO, |acc, m| acc + *m);
        let average = Minutes::new(total.get() / per_origin.len() as f64).unwrap_or(total);
        let scored = RankedCandidate {
            hub: candidate.clone(),
            total,
            average,
            per_origin,
        };
        on_scored(&scored);
        ranked.push(scored);
    }

    ranked.sort_by(|a, b| a.average.cmp(&b.average).then_with(|| a.hub.cmp(&b.hub)));
    info!(
        travellers = travellers.len(),
        candidates = candidates.len(),
        ranked = ranked.len(),
        unreachable,
        cancelled,
        "Ranked meeting candidates"
    );
    Ok(Ranking {
        candidates: ranked,
        cancelled,
    })
}
