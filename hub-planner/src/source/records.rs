//! Source-neutral records handed from the transit sources to the pipeline.
//!
//! Identifiers stay as raw strings here: deciding whether a stop is usable
//! is the graph builder's job, and it reports unusable ones as data gaps.

use serde::{Deserialize, Serialize};

use crate::domain::{LineId, Mode};

/// A line as listed by the line source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInfo {
    pub id: LineId,
    pub name: String,
    pub mode: Mode,
}

/// A stop as it appears in a route sequence or a nearby-stops response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: String,
    /// Hub or parent station identifier, if the stop is grouped.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub modes: Vec<Mode>,
}

impl StopRecord {
    /// Identifier of the hub this stop belongs to: the parent if it has one,
    /// else its own identifier. Blank identifiers resolve to nothing.
    pub fn hub_key(&self) -> Option<&str> {
        let own = self.id.trim();
        let parent = self.parent_id.as_deref().map(str::trim).unwrap_or("");
        if !parent.is_empty() {
            Some(parent)
        } else if !own.is_empty() {
            Some(own)
        } else {
            None
        }
    }
}

/// One direction/branch of a line: an ordered list of stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSequence {
    pub line: LineId,
    pub mode: Mode,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub branch: Option<u32>,
    pub stops: Vec<StopRecord>,
}

/// A point in a scheduled-interval sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPoint {
    pub stop_id: Option<String>,
    /// Cumulative minutes from the start of the sequence.
    pub minutes: Option<f64>,
}

impl IntervalPoint {
    pub fn new(stop_id: impl Into<String>, minutes: f64) -> Self {
        Self {
            stop_id: Some(stop_id.into()),
            minutes: Some(minutes),
        }
    }

    /// The stop and time, or `None` if the point is malformed.
    pub fn parts(&self) -> Option<(&str, f64)> {
        let stop = self.stop_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let minutes = self.minutes.filter(|m| m.is_finite() && *m >= 0.0)?;
        Some((stop, minutes))
    }
}

/// An ordered list of scheduled-interval points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalSequence {
    pub points: Vec<IntervalPoint>,
}

/// Which modes a journey query may use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModeFilter {
    Modes(Vec<Mode>),
    WalkingOnly,
}

/// One leg of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyLeg {
    pub mode: Mode,
    #[serde(default)]
    pub line: Option<LineId>,
    pub duration_mins: f64,
    #[serde(default)]
    pub is_walking: bool,
}

/// A complete itinerary returned by the journey source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub duration_mins: f64,
    pub legs: Vec<JourneyLeg>,
}

impl Itinerary {
    /// The only leg of a direct, non-walking itinerary.
    pub fn direct_leg(&self) -> Option<&JourneyLeg> {
        match self.legs.as_slice() {
            [leg] if !leg.is_walking => Some(leg),
            _ => None,
        }
    }

    /// Whether every leg is a walk.
    pub fn is_walk_only(&self) -> bool {
        !self.legs.is_empty() && self.legs.iter().all(|l| l.is_walking)
    }
}
