//! In-memory transit source for tests and offline builds.
//!
//! A fixture network is a single JSON document holding line listings, route
//! sequences, extra stops for the nearby search, scheduled intervals and
//! canned journey results. It is served as if it were the live API.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::domain::{LineId, Mode, StationId};

use super::error::SourceError;
use super::records::{IntervalSequence, Itinerary, LineInfo, ModeFilter, RouteSequence, StopRecord};
use super::{IntervalSource, JourneySource, LineSource, NearbySource};

/// Scheduled intervals of one line from one terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalFixture {
    pub line: LineId,
    pub from: StationId,
    pub sequences: Vec<IntervalSequence>,
}

/// Canned journey results between two stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyFixture {
    pub from: StationId,
    pub to: StationId,
    /// Served for walking-only queries instead of mode-filtered ones.
    #[serde(default)]
    pub walking: bool,
    pub itineraries: Vec<Itinerary>,
}

/// The JSON document a [`FixtureSource`] is loaded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureNetwork {
    #[serde(default)]
    pub lines: Vec<LineInfo>,
    #[serde(default)]
    pub sequences: Vec<RouteSequence>,
    /// Stops visible to the nearby search that no sequence mentions.
    #[serde(default)]
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub intervals: Vec<IntervalFixture>,
    #[serde(default)]
    pub journeys: Vec<JourneyFixture>,
}

/// Transit source serving a [`FixtureNetwork`].
#[derive(Debug)]
pub struct FixtureSource {
    lines: Vec<LineInfo>,
    sequences: HashMap<LineId, Vec<RouteSequence>>,
    stops: Vec<StopRecord>,
    intervals: HashMap<(LineId, StationId), Vec<IntervalSequence>>,
    journeys: HashMap<(StationId, StationId, bool), Vec<Itinerary>>,
    failing_lines: HashSet<LineId>,
    journey_calls: AtomicUsize,
}

impl FixtureSource {
    /// Load a fixture network from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("Failed to read {:?}: {}", path, e)))?;
        let network: FixtureNetwork = serde_json::from_str(&json)
            .map_err(|e| SourceError::Fixture(format!("Failed to parse {:?}: {}", path, e)))?;
        Ok(Self::from_network(network))
    }

    pub fn from_network(network: FixtureNetwork) -> Self {
        let mut sequences: HashMap<LineId, Vec<RouteSequence>> = HashMap::new();
        let mut seen_stops = HashSet::new();
        let mut stops = Vec::new();

        for seq in network.sequences {
            for stop in &seq.stops {
                if seen_stops.insert(stop.id.clone()) {
                    stops.push(stop.clone());
                }
            }
            sequences.entry(seq.line.clone()).or_default().push(seq);
        }
        for stop in network.stops {
            if seen_stops.insert(stop.id.clone()) {
                stops.push(stop);
            }
        }

        let mut intervals: HashMap<_, Vec<IntervalSequence>> = HashMap::new();
        for fixture in network.intervals {
            intervals
                .entry((fixture.line, fixture.from))
                .or_default()
                .extend(fixture.sequences);
        }

        let mut journeys: HashMap<_, Vec<Itinerary>> = HashMap::new();
        for fixture in network.journeys {
            journeys
                .entry((fixture.from, fixture.to, fixture.walking))
                .or_default()
                .extend(fixture.itineraries);
        }

        Self {
            lines: network.lines,
            sequences,
            stops,
            intervals,
            journeys,
            failing_lines: HashSet::new(),
            journey_calls: AtomicUsize::new(0),
        }
    }

    /// Make every request about `line` fail with a server error.
    pub fn with_failing_line(mut self, line: LineId) -> Self {
        self.failing_lines.insert(line);
        self
    }

    /// Number of journey queries served so far.
    pub fn journey_calls(&self) -> usize {
        self.journey_calls.load(Ordering::Relaxed)
    }

    fn check_line(&self, line: &LineId) -> Result<(), SourceError> {
        if self.failing_lines.contains(line) {
            return Err(SourceError::Api {
                status: 503,
                message: format!("Fixture failure for line {}", line),
            });
        }
        Ok(())
    }
}

impl LineSource for FixtureSource {
    async fn lines(&self, modes: &[Mode]) -> Result<Vec<LineInfo>, SourceError> {
        Ok(self
            .lines
            .iter()
            .filter(|l| modes.contains(&l.mode))
            .cloned()
            .collect())
    }

    async fn route_sequences(&self, line: &LineId) -> Result<Vec<RouteSequence>, SourceError> {
        self.check_line(line)?;
        self.sequences.get(line).cloned().ok_or_else(|| {
            SourceError::NotFound(format!(
                "No fixture sequences for line {}. Available: {:?}",
                line,
                self.sequences.keys().map(LineId::as_str).collect::<Vec<_>>()
            ))
        })
    }
}

impl NearbySource for FixtureSource {
    async fn nearby_stops(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<StopRecord>, SourceError> {
        let centre = Point::new(lon, lat);
        Ok(self
            .stops
            .iter()
            .filter(|s| s.lat.is_finite() && s.lon.is_finite())
            .filter(|s| Haversine.distance(centre, Point::new(s.lon, s.lat)) <= radius_m)
            .cloned()
            .collect())
    }
}

impl IntervalSource for FixtureSource {
    async fn intervals(
        &self,
        line: &LineId,
        from: &StationId,
    ) -> Result<Vec<IntervalSequence>, SourceError> {
        self.check_line(line)?;
        Ok(self
            .intervals
            .get(&(line.clone(), from.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

impl JourneySource for FixtureSource {
    async fn journeys(
        &self,
        from: &StationId,
        to: &StationId,
        filter: &ModeFilter,
    ) -> Result<Vec<Itinerary>, SourceError> {
        self.journey_calls.fetch_add(1, Ordering::Relaxed);
        let walking = matches!(filter, ModeFilter::WalkingOnly);
        let itineraries = self
            .journeys
            .get(&(from.clone(), to.clone(), walking))
            .cloned()
            .unwrap_or_default();

        Ok(match filter {
            ModeFilter::WalkingOnly => itineraries,
            ModeFilter::Modes(modes) => itineraries
                .into_iter()
                .filter(|it| {
                    it.legs
                        .iter()
                        .all(|leg| leg.is_walking || modes.contains(&leg.mode))
                })
                .collect(),
        })
    }
}
