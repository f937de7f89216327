//! Conversion from transit API DTOs to source records.
//!
//! Invalid entries are logged and skipped rather than failing the whole
//! response; the graph builder reports whatever could not be used.

use tracing::warn;

use crate::domain::{LineId, Mode};

use super::records::{
    IntervalPoint, IntervalSequence, Itinerary, JourneyLeg, LineInfo, RouteSequence, StopRecord,
};
use super::types::{
    JourneyResultsDto, LineDto, MatchedStopDto, RouteSequenceDto, StopPointsResponseDto,
    TimetableResponseDto,
};

/// Error during DTO to record conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid line identifier: {0}")]
    InvalidLine(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),
}

fn parse_modes(modes: &[String]) -> Vec<Mode> {
    modes.iter().filter_map(|m| Mode::parse(m.as_str()).ok()).collect()
}

/// Pick a parent identifier distinct from the stop's own identifier.
fn distinct_parent(own: &str, candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty() && *s != own)
        .map(String::from)
}

pub fn convert_lines(lines: Vec<LineDto>) -> Vec<LineInfo> {
    lines
        .into_iter()
        .filter_map(|dto| {
            let id = LineId::parse(dto.id.as_str()).ok()?;
            let Ok(mode) = Mode::parse(dto.mode_name.as_str()) else {
                warn!(line = %id, mode = %dto.mode_name, "Skipping line with invalid mode");
                return None;
            };
            Some(LineInfo {
                id,
                name: dto.name,
                mode,
            })
        })
        .collect()
}

fn convert_matched_stop(stop: &MatchedStopDto) -> StopRecord {
    let id = stop.id.clone().unwrap_or_default();
    let parent_id = distinct_parent(
        &id,
        &[stop.top_most_parent_id.as_ref(), stop.station_id.as_ref()],
    );
    StopRecord {
        name: stop.name.clone().unwrap_or_else(|| id.clone()),
        parent_id,
        lat: stop.lat.unwrap_or(f64::NAN),
        lon: stop.lon.unwrap_or(f64::NAN),
        modes: parse_modes(&stop.modes),
        id,
    }
}

/// Convert a route-sequence response into one record per direction/branch.
pub fn convert_route_sequence(dto: &RouteSequenceDto) -> Result<Vec<RouteSequence>, ConversionError> {
    let line = LineId::parse(dto.line_id.as_str())
        .map_err(|_| ConversionError::InvalidLine(dto.line_id.clone()))?;
    let mode =
        Mode::parse(dto.mode.as_str()).map_err(|_| ConversionError::InvalidMode(dto.mode.clone()))?;

    Ok(dto
        .stop_point_sequences
        .iter()
        .map(|seq| RouteSequence {
            line: line.clone(),
            mode: mode.clone(),
            direction: seq.direction.clone(),
            branch: seq.branch_id,
            stops: seq.stop_point.iter().map(convert_matched_stop).collect(),
        })
        .collect())
}

pub fn convert_stop_points(dto: StopPointsResponseDto) -> Vec<StopRecord> {
    dto.stop_points
        .into_iter()
        .map(|sp| {
            let id = sp.naptan_id.unwrap_or_default();
            let parent_id = distinct_parent(
                &id,
                &[sp.hub_naptan_code.as_ref(), sp.station_naptan.as_ref()],
            );
            StopRecord {
                name: sp.common_name.unwrap_or_else(|| id.clone()),
                parent_id,
                lat: sp.lat.unwrap_or(f64::NAN),
                lon: sp.lon.unwrap_or(f64::NAN),
                modes: parse_modes(&sp.modes),
                id,
            }
        })
        .collect()
}

/// Flatten a timetable into its interval sequences.
///
/// Each sequence starts at the departure stop at minute zero, followed by
/// the listed intervals. Points are passed through unvalidated; the resolver
/// decides what counts as malformed.
pub fn convert_timetable(dto: TimetableResponseDto) -> Vec<IntervalSequence> {
    let Some(timetable) = dto.timetable else {
        return Vec::new();
    };
    let departure = timetable.departure_stop_id;
    timetable
        .routes
        .into_iter()
        .flat_map(|route| route.station_intervals)
        .map(|si| {
            let mut points = Vec::with_capacity(si.intervals.len() + 1);
            if let Some(departure) = &departure
                && si.intervals.first().and_then(|i| i.stop_id.as_ref()) != Some(departure)
            {
                points.push(IntervalPoint {
                    stop_id: Some(departure.clone()),
                    minutes: Some(0.0),
                });
            }
            points.extend(si.intervals.into_iter().map(|i| IntervalPoint {
                stop_id: i.stop_id,
                minutes: i.time_to_arrival,
            }));
            IntervalSequence { points }
        })
        .collect()
}

/// Convert journey results, dropping itineraries with incomplete legs.
pub fn convert_journeys(dto: JourneyResultsDto) -> Vec<Itinerary> {
    dto.journeys
        .into_iter()
        .filter_map(|journey| {
            let legs: Option<Vec<JourneyLeg>> = journey
                .legs
                .iter()
                .map(|leg| {
                    let mode = Mode::parse(leg.mode.as_ref()?.id.as_str()).ok()?;
                    let duration_mins = leg.duration?;
                    let line = leg
                        .route_options
                        .iter()
                        .filter_map(|o| o.line_identifier.as_ref())
                        .find_map(|l| LineId::parse(l.id.as_str()).ok());
                    Some(JourneyLeg {
                        is_walking: mode.is_walking(),
                        mode,
                        line,
                        duration_mins,
                    })
                })
                .collect();
            let legs = legs?;
            if legs.is_empty() {
                return None;
            }
            let duration_mins = journey
                .duration
                .unwrap_or_else(|| legs.iter().map(|l| l.duration_mins).sum());
            Some(Itinerary {
                duration_mins,
                legs,
            })
        })
        .collect()
}
