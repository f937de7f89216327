//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{EdgeKey, HubId};
use crate::graph::HubGraph;
use crate::planner::{RankedCandidate, SearchOutcome};
use crate::stations::StationMatch;

/// Query for station search.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Search text
    pub q: String,

    /// Maximum results (default 10, capped at 50)
    pub limit: Option<usize>,
}

/// Station search results.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationMatch>,
}

/// Query for a single journey time.
#[derive(Debug, Deserialize)]
pub struct JourneyTimeRequest {
    /// Origin: hub id, station id or name
    pub from: String,

    /// Destination: hub id, station id or name
    pub to: String,
}

/// A hub with its display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubRef {
    pub id: String,
    pub name: String,
}

impl HubRef {
    pub fn new(graph: &HubGraph, hub: &HubId) -> Self {
        Self {
            id: hub.to_string(),
            name: graph.hub(hub).map(|h| h.name.clone()).unwrap_or_default(),
        }
    }
}

/// One step of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub to: HubRef,
    /// Line id, or "transfer" for a walk
    pub via: String,
}

fn via(key: &EdgeKey) -> String {
    match key {
        EdgeKey::Line(line) => line.to_string(),
        EdgeKey::Transfer => "transfer".to_string(),
    }
}

/// Fastest route between two hubs.
#[derive(Debug, Serialize)]
pub struct JourneyTimeResponse {
    pub from: HubRef,
    pub to: HubRef,
    pub minutes: f64,
    pub line_changes: usize,
    pub penalty_minutes: f64,
    pub steps: Vec<RouteStep>,
}

impl JourneyTimeResponse {
    pub fn from_outcome(graph: &HubGraph, outcome: &SearchOutcome) -> Self {
        let steps = outcome
            .path
            .iter()
            .skip(1)
            .zip(&outcome.keys)
            .map(|(hub, key)| RouteStep {
                to: HubRef::new(graph, hub),
                via: via(key),
            })
            .collect();
        let first = outcome.path.first();
        let last = outcome.path.last();
        Self {
            from: first.map(|h| HubRef::new(graph, h)).unwrap_or_else(empty_ref),
            to: last.map(|h| HubRef::new(graph, h)).unwrap_or_else(empty_ref),
            minutes: outcome.minutes.get(),
            line_changes: outcome.line_changes,
            penalty_minutes: outcome.penalty.get(),
            steps,
        }
    }
}

fn empty_ref() -> HubRef {
    HubRef {
        id: String::new(),
        name: String::new(),
    }
}

/// One person in a meeting request.
#[derive(Debug, Deserialize)]
pub struct TravellerRequest {
    /// Starting hub id, station id or name
    pub station: String,

    /// Minutes walked before reaching the station
    #[serde(default)]
    pub pre_walk_mins: f64,
}

/// Request to find a meeting hub.
#[derive(Debug, Deserialize)]
pub struct MeetRequest {
    pub travellers: Vec<TravellerRequest>,

    /// Candidate hubs (ids, station ids or names). Every hub when absent.
    pub candidates: Option<Vec<String>>,

    /// Maximum results (defaults to the configured top_k)
    pub top_k: Option<usize>,
}

/// A ranked meeting hub.
#[derive(Debug, Serialize)]
pub struct MeetCandidate {
    pub hub: HubRef,
    pub average_minutes: f64,
    pub total_minutes: f64,
    /// Per traveller, in request order
    pub per_traveller_minutes: Vec<f64>,
}

impl MeetCandidate {
    pub fn from_ranked(graph: &HubGraph, ranked: &RankedCandidate) -> Self {
        Self {
            hub: HubRef::new(graph, &ranked.hub),
            average_minutes: ranked.average.get(),
            total_minutes: ranked.total.get(),
            per_traveller_minutes: ranked.per_origin.iter().map(|m| m.get()).collect(),
        }
    }
}

/// Ranked meeting hubs, best first.
#[derive(Debug, Serialize)]
pub struct MeetResponse {
    pub candidates: Vec<MeetCandidate>,
    /// Ranking stopped before every candidate was evaluated
    pub partial: bool,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Possible matches for an ambiguous station query
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<StationMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineId, Minutes};

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn graph() -> HubGraph {
        let mut g = HubGraph::new();
        for (id, name) in [("A", "Alpha"), ("B", "Bravo"), ("C", "Charlie")] {
            g.upsert_hub(hub(id), name, 51.5, -0.1);
        }
        g
    }

    #[test]
    fn journey_response_lists_steps() {
        let outcome = SearchOutcome {
            minutes: Minutes::new(12.0).unwrap(),
            path: vec![hub("A"), hub("B"), hub("C")],
            keys: vec![EdgeKey::Line(LineId::parse("L1").unwrap()), EdgeKey::Transfer],
            line_changes: 0,
            penalty: Minutes::ZERO,
        };

        let response = JourneyTimeResponse::from_outcome(&graph(), &outcome);

        assert_eq!(response.from.name, "Alpha");
        assert_eq!(response.to.id, "C");
        assert_eq!(response.minutes, 12.0);
        assert_eq!(response.steps.len(), 2);
        assert_eq!(response.steps[0].via, "L1");
        assert_eq!(response.steps[1].via, "transfer");
        assert_eq!(response.steps[1].to.name, "Charlie");
    }

    #[test]
    fn single_hub_route_has_no_steps() {
        let outcome = SearchOutcome {
            minutes: Minutes::ZERO,
            path: vec![hub("A")],
            keys: Vec::new(),
            line_changes: 0,
            penalty: Minutes::ZERO,
        };

        let response = JourneyTimeResponse::from_outcome(&graph(), &outcome);

        assert_eq!(response.from, response.to);
        assert!(response.steps.is_empty());
    }

    #[test]
    fn meet_request_defaults() {
        let req: MeetRequest =
            serde_json::from_str(r#"{"travellers": [{"station": "A"}]}"#).unwrap();

        assert_eq!(req.travellers[0].pre_walk_mins, 0.0);
        assert!(req.candidates.is_none());
        assert!(req.top_k.is_none());
    }

    #[test]
    fn error_response_omits_empty_candidates() {
        let body = serde_json::to_value(ErrorResponse {
            error: "nope".into(),
            candidates: Vec::new(),
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"error": "nope"}));
    }
}
