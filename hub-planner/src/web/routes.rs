//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{info, warn};

use crate::domain::{HubId, Minutes};
use crate::planner::{CancelToken, JourneySearch, SearchError, Traveller, rank_candidates};
use crate::stations::{NameMatch, StationMatch};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations/search", get(search_stations))
        .route("/api/journey-time", get(journey_time))
        .route("/api/meet", post(meet))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search stations by name.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    let limit = req.limit.unwrap_or(10).min(50);
    let stations = state.names.search(&req.q, limit);

    Json(StationSearchResponse { stations })
}

/// Resolve user text to exactly one hub.
fn resolve_hub(state: &AppState, query: &str) -> Result<HubId, AppError> {
    match state.names.resolve(query) {
        NameMatch::Found(hub) => Ok(hub),
        NameMatch::Ambiguous(candidates) => Err(AppError::Ambiguous {
            query: query.to_string(),
            candidates,
        }),
        NameMatch::NotFound => Err(AppError::NotFound {
            message: format!("Station not found: {query}"),
        }),
    }
}

/// Fastest journey time between two stations.
async fn journey_time(
    State(state): State<AppState>,
    Query(req): Query<JourneyTimeRequest>,
) -> Result<Json<JourneyTimeResponse>, AppError> {
    let from = resolve_hub(&state, &req.from)?;
    let to = resolve_hub(&state, &req.to)?;

    let search = JourneySearch::new(&state.graph, (*state.config).clone());
    let outcome = search.search(&from, &to)?.ok_or_else(|| AppError::NotFound {
        message: format!("No route from {from} to {to}"),
    })?;

    Ok(Json(JourneyTimeResponse::from_outcome(&state.graph, &outcome)))
}

/// Cancels the token when dropped, so a ranking stops if its request is
/// abandoned.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Rank meeting hubs for a group of travellers.
///
/// Ranking runs on the blocking pool. If it outlasts the state's meet
/// budget it is cancelled and the candidates ranked so far are returned.
async fn meet(
    State(state): State<AppState>,
    Json(req): Json<MeetRequest>,
) -> Result<Json<MeetResponse>, AppError> {
    if req.travellers.is_empty() {
        return Err(AppError::BadRequest {
            message: "At least one traveller is required".to_string(),
        });
    }

    let mut travellers = Vec::with_capacity(req.travellers.len());
    for t in &req.travellers {
        let origin = resolve_hub(&state, &t.station)?;
        let pre_walk = Minutes::new(t.pre_walk_mins).map_err(|e| AppError::BadRequest {
            message: format!("Invalid pre-walk for {}: {e}", t.station),
        })?;
        travellers.push(Traveller::new(origin, pre_walk));
    }

    let candidates: Vec<HubId> = match &req.candidates {
        Some(list) => {
            let mut hubs = Vec::with_capacity(list.len());
            for query in list {
                hubs.push(resolve_hub(&state, query)?);
            }
            hubs
        }
        None => state.graph.hubs().map(|h| h.id.clone()).collect(),
    };
    let top_k = req.top_k.unwrap_or(state.config.top_k);

    let token = CancelToken::with_budget(state.meet_budget);
    let _guard = CancelOnDrop(token.clone());
    let graph = Arc::clone(&state.graph);
    let config = (*state.config).clone();
    let ranked = tokio::task::spawn_blocking(move || {
        let search = JourneySearch::new(&graph, config);
        rank_candidates(&search, &travellers, &candidates, &token)
    })
    .await;

    let ranking = ranked.map_err(|e| AppError::Internal {
        message: format!("Ranking task failed: {e}"),
    })??;
    if ranking.cancelled {
        warn!(
            ranked = ranking.candidates.len(),
            "Meeting ranking hit its time budget"
        );
    }
    info!(
        travellers = req.travellers.len(),
        results = ranking.candidates.len().min(top_k),
        "Ranked meeting hubs"
    );

    Ok(Json(MeetResponse {
        candidates: ranking
            .top(top_k)
            .iter()
            .map(|c| MeetCandidate::from_ranked(&state.graph, c))
            .collect(),
        partial: ranking.cancelled,
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Ambiguous { query: String, candidates: Vec<StationMatch> },
    Internal { message: String },
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::StationNotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, candidates) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message, Vec::new()),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message, Vec::new()),
            AppError::Ambiguous { query, candidates } => (
                StatusCode::CONFLICT,
                format!("Ambiguous station: {query}"),
                candidates,
            ),
            AppError::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
            }
        };

        warn!(%status, %error, "Request failed");

        let body = Json(ErrorResponse { error, candidates });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::{Edge, LineId, Mode, StationId};
    use crate::graph::HubGraph;
    use crate::planner::SearchConfig;

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    /// Alpha <-> Bravo Street on L1 (4), Bravo Street <-> Bravo Park on L2 (3).
    fn state() -> AppState {
        let mut g = HubGraph::new();
        for (id, name) in [("A", "Alpha"), ("B", "Bravo Street"), ("P", "Bravo Park")] {
            g.upsert_hub(hub(id), name, 51.5, -0.1);
            g.add_station(&hub(id), StationId::parse(id).unwrap(), name)
                .unwrap();
        }
        let tube = Mode::parse("tube").unwrap();
        for (a, b, line, w) in [("A", "B", "L1", 4.0), ("B", "P", "L2", 3.0)] {
            for (x, y) in [(a, b), (b, a)] {
                let mut edge = Edge::line(hub(x), hub(y), LineId::parse(line).unwrap(), tube.clone());
                edge.weight = Some(Minutes::new(w).unwrap());
                g.add_edge(edge).unwrap();
            }
        }
        AppState::new(g, SearchConfig::default())
    }

    fn journey(from: &str, to: &str) -> Query<JourneyTimeRequest> {
        Query(JourneyTimeRequest {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn journey_time_by_name() {
        let Json(response) = journey_time(State(state()), journey("alpha", "bravo park"))
            .await
            .unwrap();

        // 4 + 3 plus one line change.
        assert_eq!(response.minutes, 12.0);
        assert_eq!(response.line_changes, 1);
        assert_eq!(response.to.name, "Bravo Park");
        assert_eq!(response.steps.len(), 2);
    }

    #[tokio::test]
    async fn ambiguous_station_is_a_conflict() {
        let err = journey_time(State(state()), journey("A", "bravo"))
            .await
            .unwrap_err();

        let AppError::Ambiguous { candidates, .. } = &err else {
            panic!("expected an ambiguous match, got {err:?}");
        };
        assert_eq!(candidates.len(), 2);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_station_is_not_found() {
        let err = journey_time(State(state()), journey("A", "Zulu"))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_stations_caps_the_limit() {
        let Json(response) = search_stations(
            State(state()),
            Query(StationSearchRequest {
                q: "bravo".to_string(),
                limit: Some(1),
            }),
        )
        .await;

        assert_eq!(response.stations.len(), 1);
    }

    #[tokio::test]
    async fn meet_ranks_every_hub_by_default() {
        let req = MeetRequest {
            travellers: vec![
                TravellerRequest {
                    station: "A".to_string(),
                    pre_walk_mins: 0.0,
                },
                TravellerRequest {
                    station: "P".to_string(),
                    pre_walk_mins: 0.0,
                },
            ],
            candidates: None,
            top_k: Some(2),
        };

        let Json(response) = meet(State(state()), Json(req)).await.unwrap();

        assert!(!response.partial);
        assert_eq!(response.candidates.len(), 2);
        // B: 4 and 3, average 3.5.
        assert_eq!(response.candidates[0].hub.id, "B");
        assert_eq!(response.candidates[0].average_minutes, 3.5);
        assert_eq!(response.candidates[0].per_traveller_minutes, vec![4.0, 3.0]);
    }

    #[tokio::test]
    async fn meet_over_budget_is_partial() {
        let req = MeetRequest {
            travellers: vec![TravellerRequest {
                station: "A".to_string(),
                pre_walk_mins: 0.0,
            }],
            candidates: None,
            top_k: None,
        };
        let state = state().with_meet_budget(Duration::ZERO);

        let Json(response) = meet(State(state), Json(req)).await.unwrap();

        assert!(response.partial);
        assert!(response.candidates.is_empty());
    }

    #[tokio::test]
    async fn meet_needs_travellers() {
        let req = MeetRequest {
            travellers: Vec::new(),
            candidates: None,
            top_k: None,
        };

        let err = meet(State(state()), Json(req)).await.unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn abandoned_request_cancels_its_ranking() {
        let token = CancelToken::new();
        drop(CancelOnDrop(token.clone()));
        assert!(token.is_cancelled());
    }

    #[test]
    fn search_error_maps_to_not_found() {
        let err = AppError::from(SearchError::StationNotFound(hub("Q")));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
