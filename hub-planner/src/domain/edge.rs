//! Directed, keyed edges between hubs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{HubId, LineId, Minutes, Mode};

/// Key under which a routing step is taken: a line, or a walking transfer.
///
/// Two hubs have at most one edge per key in each direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKey {
    Line(LineId),
    Transfer,
}

impl EdgeKey {
    pub fn is_transfer(&self) -> bool {
        matches!(self, EdgeKey::Transfer)
    }

    pub fn line(&self) -> Option<&LineId> {
        match self {
            EdgeKey::Line(line) => Some(line),
            EdgeKey::Transfer => None,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKey::Line(line) => f.write_str(line.as_str()),
            EdgeKey::Transfer => f.write_str("transfer"),
        }
    }
}

/// What an edge represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Direct service on one line.
    ///
    /// Direction and branch are informational only.
    Line {
        line: LineId,
        mode: Mode,
        direction: Option<String>,
        branch: Option<u32>,
    },
    /// A walking connection between two nearby hubs.
    Transfer,
}

/// A directed connection between two hubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: HubId,
    pub target: HubId,
    pub kind: EdgeKind,
    /// `None` until a resolver supplies a duration.
    pub weight: Option<Minutes>,
}

impl Edge {
    /// An unresolved line edge.
    pub fn line(source: HubId, target: HubId, line: LineId, mode: Mode) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Line {
                line,
                mode,
                direction: None,
                branch: None,
            },
            weight: None,
        }
    }

    /// An unresolved transfer edge.
    pub fn transfer(source: HubId, target: HubId) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Transfer,
            weight: None,
        }
    }

    /// Attach direction/branch metadata to a line edge.
    pub fn with_route_info(mut self, dir: Option<String>, branch_id: Option<u32>) -> Self {
        if let EdgeKind::Line {
            direction, branch, ..
        } = &mut self.kind
        {
            *direction = dir;
            *branch = branch_id;
        }
        self
    }

    pub fn key(&self) -> EdgeKey {
        match &self.kind {
            EdgeKind::Line { line, .. } => EdgeKey::Line(line.clone()),
            EdgeKind::Transfer => EdgeKey::Transfer,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self.kind, EdgeKind::Transfer)
    }

    pub fn mode(&self) -> Option<&Mode> {
        match &self.kind {
            EdgeKind::Line { mode, .. } => Some(mode),
            EdgeKind::Transfer => None,
        }
    }

    pub fn triple(&self) -> EdgeTriple {
        EdgeTriple {
            source: self.source.clone(),
            target: self.target.clone(),
            key: self.key(),
        }
    }
}

/// A directed (source, target, key) triple identifying one edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeTriple {
    pub source: HubId,
    pub target: HubId,
    pub key: EdgeKey,
}

impl EdgeTriple {
    pub fn new(source: HubId, target: HubId, key: EdgeKey) -> Self {
        Self {
            source,
            target,
            key,
        }
    }

    /// The same key in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            key: self.key.clone(),
        }
    }
}

impl fmt::Display for EdgeTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.source, self.target, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    #[test]
    fn line_edge_key() {
        let line = LineId::parse("victoria").unwrap();
        let edge = Edge::line(hub("A"), hub("B"), line.clone(), Mode::parse("tube").unwrap());
        assert_eq!(edge.key(), EdgeKey::Line(line));
        assert!(!edge.is_transfer());
        assert!(edge.weight.is_none());
    }

    #[test]
    fn transfer_edge_key() {
        let edge = Edge::transfer(hub("A"), hub("B"));
        assert_eq!(edge.key(), EdgeKey::Transfer);
        assert!(edge.mode().is_none());
        assert_eq!(edge.key().to_string(), "transfer");
    }

    #[test]
    fn route_info_only_applies_to_line_edges() {
        let edge = Edge::line(
            hub("A"),
            hub("B"),
            LineId::parse("central").unwrap(),
            Mode::parse("tube").unwrap(),
        )
        .with_route_info(Some("outbound".into()), Some(2));
        assert!(matches!(
            edge.kind,
            EdgeKind::Line { ref direction, branch: Some(2), .. } if direction.as_deref() == Some("outbound")
        ));

        let transfer = Edge::transfer(hub("A"), hub("B")).with_route_info(Some("x".into()), None);
        assert_eq!(transfer.kind, EdgeKind::Transfer);
    }

    #[test]
    fn triple_reversal() {
        let t = EdgeTriple::new(hub("A"), hub("B"), EdgeKey::Transfer);
        let r = t.reversed();
        assert_eq!(r.source, hub("B"));
        assert_eq!(r.target, hub("A"));
        assert_eq!(r.reversed(), t);
        assert_eq!(t.to_string(), "A -> B [transfer]");
    }
}
