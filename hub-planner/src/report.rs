//! Per-stage issue accounting.
//!
//! Non-fatal problems (missing data, failed upstream calls, disagreeing
//! observations) are recorded as they happen and summarized once at the end
//! of each pipeline stage. Recording never interrupts the stage.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

/// Number of example details kept per issue kind.
const MAX_EXAMPLES: usize = 5;

/// Category of a non-fatal pipeline issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    /// Missing or malformed input data.
    DataGap,
    /// An upstream call that failed after retries.
    ExternalCallFailure,
    /// Observations of one edge outside the agreement tolerance.
    ReconciliationDiscrepancy,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::DataGap => "data gap",
            IssueKind::ExternalCallFailure => "external call failure",
            IssueKind::ReconciliationDiscrepancy => "reconciliation discrepancy",
        };
        f.write_str(s)
    }
}

/// Issues accumulated during one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    stage: &'static str,
    counts: BTreeMap<IssueKind, usize>,
    examples: BTreeMap<IssueKind, Vec<String>>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            counts: BTreeMap::new(),
            examples: BTreeMap::new(),
        }
    }

    /// Record one issue.
    pub fn record(&mut self, kind: IssueKind, detail: impl Into<String>) {
        let detail = detail.into();
        debug!(stage = self.stage, %kind, %detail, "Stage issue");

        *self.counts.entry(kind).or_default() += 1;
        let examples = self.examples.entry(kind).or_default();
        if examples.len() < MAX_EXAMPLES {
            examples.push(detail);
        }
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Up to five example details for `kind`, in recording order.
    pub fn examples(&self, kind: IssueKind) -> &[String] {
        self.examples.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Log the end-of-stage summary.
    pub fn log_summary(&self) {
        if self.is_clean() {
            info!(stage = self.stage, "Stage completed with no issues");
            return;
        }
        for (kind, count) in &self.counts {
            warn!(
                stage = self.stage,
                %kind,
                count,
                examples = ?self.examples(*kind),
                "Stage issues"
            );
        }
    }
}
