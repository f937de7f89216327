//! The graph build pipeline.
//!
//! Runs the stages in order over one transit source:
//!
//! 1. construction from route sequences, then the override pass
//! 2. proximity transfers
//! 3. timetable, journey and transfer resolution
//! 4. merge and validation
//!
//! Every stage records its non-fatal issues in a [`StageReport`] and logs a
//! summary when it finishes. Only a failed validation (or an unusable
//! configuration, override file or store) stops the run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{EdgeTriple, LineId, Minutes, Mode};
use crate::graph::{
    self, GraphError, HubGraph, MergeOutcome, OverrideOutcome, OverrideSet, ProximityConfig,
    ValidationReport,
};
use crate::report::StageReport;
use crate::resolve::{
    self, Aggregate, ReconcilePolicy, ResolveError, ResolvedStore, Tolerance,
};
use crate::source::{SourceError, TransitSource};

/// Error that stops a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("resolution store error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("graph failed validation: {0}")]
    Validation(ValidationReport),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_modes() -> Vec<Mode> {
    ["tube", "dlr", "overground", "elizabeth-line"]
        .into_iter()
        .filter_map(|m| Mode::parse(m).ok())
        .collect()
}

/// Configuration for a pipeline run. Every field has a default, so a JSON
/// config file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Modes whose lines are built when `lines` is empty.
    pub modes: Vec<Mode>,

    /// Explicit lines to build. Overrides `modes`.
    pub lines: Vec<LineId>,

    /// Concurrent upstream calls per batch in every stage.
    pub batch_size: usize,

    pub proximity: ProximityConfig,

    /// Modes resolved from timetables; other line edges fall back to
    /// journey queries.
    pub interval_modes: BTreeSet<Mode>,

    pub tolerance: Tolerance,
    pub aggregate: Aggregate,

    /// Smallest weight for timetable-resolved edges (minutes).
    pub timetable_floor_mins: f64,

    /// Smallest weight for journey-resolved line edges (minutes).
    pub journey_floor_mins: f64,

    /// Smallest weight for transfer edges (minutes).
    pub transfer_floor_mins: f64,

    /// Remove transfer pairs that never got a weight instead of failing
    /// validation.
    pub drop_unresolved_transfers: bool,

    /// Resolution store kept across runs. In memory when unset.
    pub store_path: Option<PathBuf>,

    /// Override document applied after construction.
    pub overrides_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            lines: Vec::new(),
            batch_size: 8,
            proximity: ProximityConfig::default(),
            interval_modes: default_modes().into_iter().collect(),
            tolerance: Tolerance::default(),
            aggregate: Aggregate::default(),
            timetable_floor_mins: 0.5,
            journey_floor_mins: 1.0,
            transfer_floor_mins: 1.0,
            drop_unresolved_transfers: true,
            store_path: None,
            overrides_path: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_lines(mut self, lines: Vec<LineId>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_overrides_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides_path = Some(path.into());
        self
    }

    fn policy(&self, floor_mins: f64, name: &str) -> Result<ReconcilePolicy, PipelineError> {
        let floor = Minutes::new(floor_mins)
            .ok()
            .filter(|f| f.get() > 0.0)
            .ok_or_else(|| {
                PipelineError::Config(format!("{name} must be positive, got {floor_mins}"))
            })?;
        Ok(ReconcilePolicy::new(floor)
            .with_tolerance(self.tolerance)
            .with_aggregate(self.aggregate))
    }
}

/// A finished, validated graph and what it took to get there.
#[derive(Debug)]
pub struct PipelineRun {
    pub graph: HubGraph,
    pub overrides: OverrideOutcome,
    pub merge: MergeOutcome,
    pub transfer_candidates: usize,
    /// One report per stage, in run order.
    pub reports: Vec<StageReport>,
}

impl PipelineRun {
    /// Total issues recorded across all stages.
    pub fn issue_count(&self) -> usize {
        self.reports.iter().map(StageReport::total).sum()
    }
}

/// The build pipeline over one transit source.
#[derive(Debug)]
pub struct Pipeline<S> {
    source: S,
    config: PipelineConfig,
}

impl<S: TransitSource> Pipeline<S> {
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Lines to build: the configured list, or every line of the configured
    /// modes.
    async fn lines(&self) -> Result<Vec<LineId>, PipelineError> {
        if !self.config.lines.is_empty() {
            return Ok(self.config.lines.clone());
        }
        let listed = self.source.lines(&self.config.modes).await?;
        let lines: BTreeSet<LineId> = listed.into_iter().map(|l| l.id).collect();
        info!(modes = ?self.config.modes, lines = lines.len(), "Discovered lines");
        Ok(lines.into_iter().collect())
    }

    /// Run every stage and return the validated graph.
    ///
    /// The resolution store is saved before validation, so weights learned
    /// by a failing run are reused by the next one.
    pub async fn run(&self) -> Result<PipelineRun, PipelineError> {
        let config = &self.config;
        let timetable_policy = config.policy(config.timetable_floor_mins, "timetable_floor_mins")?;
        let journey_policy = config.policy(config.journey_floor_mins, "journey_floor_mins")?;
        let transfer_policy = config.policy(config.transfer_floor_mins, "transfer_floor_mins")?;
        let batch_size = config.batch_size.max(1);
        let mut reports = Vec::new();

        let lines = self.lines().await?;
        if lines.is_empty() {
            warn!("No lines to build");
        }
        let built = graph::build_from_source(&self.source, &lines, batch_size).await;
        built.report.log_summary();
        reports.push(built.report);
        let mut hub_graph = built.graph;

        let overrides = match &config.overrides_path {
            Some(path) => OverrideSet::from_file(path)?,
            None => OverrideSet::default(),
        };
        let override_outcome = overrides.apply(&mut hub_graph)?;

        let proximity = graph::augment(&mut hub_graph, &self.source, &config.proximity).await;
        proximity.report.log_summary();
        reports.push(proximity.report);

        let mut store = match &config.store_path {
            Some(path) => ResolvedStore::open(path)?,
            None => ResolvedStore::in_memory(),
        };

        let interval_lines = resolve::interval_lines(&hub_graph, &config.interval_modes);
        let timetable = resolve::resolve_timetables(
            &hub_graph,
            &interval_lines,
            &built.terminals,
            &self.source,
            &timetable_policy,
            batch_size,
        )
        .await;
        timetable.report.log_summary();

        let pending: Vec<EdgeTriple> = hub_graph
            .unresolved_edges()
            .filter(|e| !e.is_transfer())
            .map(|e| e.triple())
            .filter(|t| !timetable.weights.contains_key(t))
            .collect();
        let journeys = resolve::resolve_journeys(
            &hub_graph,
            &pending,
            &self.source,
            &mut store,
            &journey_policy,
            batch_size,
        )
        .await;
        journeys.report.log_summary();

        let transfers = resolve::resolve_transfers(
            &hub_graph,
            &proximity.candidates,
            &self.source,
            &mut store,
            &transfer_policy,
            batch_size,
        )
        .await;
        transfers.report.log_summary();

        store.save()?;

        let mut weights = BTreeMap::new();
        for outcome in [timetable, journeys, transfers] {
            weights.extend(outcome.weights);
            reports.push(outcome.report);
        }
        // Weights pinned by overrides win over resolved ones.
        weights.retain(|triple, _| {
            let pinned = hub_graph.edge(triple).is_some_and(|e| e.weight.is_some());
            if pinned {
                debug!(edge = %triple, "Keeping pinned weight");
            }
            !pinned
        });

        let merge = graph::merge_and_validate(
            &mut hub_graph,
            &weights,
            config.drop_unresolved_transfers,
        )
        .map_err(PipelineError::Validation)?;

        let run = PipelineRun {
            graph: hub_graph,
            overrides: override_outcome,
            merge,
            transfer_candidates: proximity.candidates.len(),
            reports,
        };
        info!(
            hubs = run.graph.node_count(),
            edges = run.graph.edge_count(),
            issues = run.issue_count(),
            "Pipeline finished"
        );
        Ok(run)
    }
}
