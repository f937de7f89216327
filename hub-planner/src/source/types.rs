//! Transit API response DTOs.
//!
//! These types map directly to the Unified API JSON responses. They use
//! `Option` liberally because the API omits fields rather than sending null
//! values in many cases.

use serde::Deserialize;

/// An entry from `GET /Line/Mode/{modes}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDto {
    pub id: String,
    pub name: String,
    pub mode_name: String,
}

/// Response from `GET /Line/{id}/Route/Sequence/all`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSequenceDto {
    pub line_id: String,
    pub mode: String,
    #[serde(default)]
    pub stop_point_sequences: Vec<StopPointSequenceDto>,
}

/// One direction/branch of a route sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPointSequenceDto {
    pub direction: Option<String>,
    pub branch_id: Option<u32>,
    #[serde(default)]
    pub stop_point: Vec<MatchedStopDto>,
}

/// A stop inside a route sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedStopDto {
    pub id: Option<String>,
    /// Station the stop point belongs to.
    pub station_id: Option<String>,
    /// Outermost grouping (often a `HUB…` identifier).
    pub top_most_parent_id: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Response from `GET /StopPoint?lat=&lon=&radius=`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPointsResponseDto {
    #[serde(default)]
    pub stop_points: Vec<StopPointDto>,
}

/// A stop point returned by the nearby search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPointDto {
    pub naptan_id: Option<String>,
    pub hub_naptan_code: Option<String>,
    pub station_naptan: Option<String>,
    pub common_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Response from `GET /Line/{id}/Timetable/{fromStopPointId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResponseDto {
    pub timetable: Option<TimetableDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableDto {
    /// The terminal the timetable departs from. Intervals list only the
    /// stops after it.
    pub departure_stop_id: Option<String>,
    #[serde(default)]
    pub routes: Vec<TimetableRouteDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRouteDto {
    #[serde(default)]
    pub station_intervals: Vec<StationIntervalDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationIntervalDto {
    #[serde(default)]
    pub intervals: Vec<IntervalDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalDto {
    pub stop_id: Option<String>,
    /// Minutes from the start of the sequence.
    pub time_to_arrival: Option<f64>,
}

/// Response from `GET /Journey/JourneyResults/{from}/to/{to}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyResultsDto {
    #[serde(default)]
    pub journeys: Vec<JourneyDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyDto {
    pub duration: Option<f64>,
    #[serde(default)]
    pub legs: Vec<LegDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegDto {
    pub duration: Option<f64>,
    pub mode: Option<IdentifierDto>,
    #[serde(default)]
    pub route_options: Vec<RouteOptionDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptionDto {
    pub line_identifier: Option<IdentifierDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierDto {
    pub id: String,
}
