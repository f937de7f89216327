//! Application state for the web layer.

use std::sync::Arc;
use std::time::Duration;

use crate::graph::HubGraph;
use crate::planner::SearchConfig;
use crate::stations::StationNames;

/// Default time allowed for ranking meeting candidates.
const DEFAULT_MEET_BUDGET: Duration = Duration::from_secs(10);

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// The finalized graph, shared read-only by every request
    pub graph: Arc<HubGraph>,

    /// Name lookup over the graph
    pub names: StationNames,

    /// Journey search configuration
    pub config: Arc<SearchConfig>,

    /// Time allowed for a meeting ranking before it returns partial results
    pub meet_budget: Duration,
}

impl AppState {
    /// Create a new app state.
    pub fn new(graph: HubGraph, config: SearchConfig) -> Self {
        let names = StationNames::from_graph(&graph);
        Self {
            graph: Arc::new(graph),
            names,
            config: Arc::new(config),
            meet_budget: DEFAULT_MEET_BUDGET,
        }
    }

    pub fn with_meet_budget(mut self, budget: Duration) -> Self {
        self.meet_budget = budget;
        self
    }
}
