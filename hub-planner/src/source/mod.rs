//! Upstream transit data sources.
//!
//! The pipeline depends only on the four traits below. Implementations:
//!
//! - [`TransitClient`]: HTTP client for the Unified API, with retry,
//!   throttling and a per-request timeout
//! - [`CachedSource`]: TTL cache around any source
//! - [`FixtureSource`]: in-memory network, loadable from JSON, for tests and
//!   offline builds

mod cache;
mod client;
mod convert;
mod error;
mod fixture;
mod records;
mod retry;
mod throttle;
mod types;

use std::future::Future;

use crate::domain::{LineId, Mode, StationId};

pub use cache::{CacheConfig, CachedSource};
pub use client::{TransitClient, TransitConfig};
pub use convert::ConversionError;
pub use error::SourceError;
pub use fixture::{FixtureNetwork, FixtureSource, IntervalFixture, JourneyFixture};
pub use records::{
    IntervalPoint, IntervalSequence, Itinerary, JourneyLeg, LineInfo, ModeFilter, RouteSequence,
    StopRecord,
};
pub use retry::RetryPolicy;
pub use throttle::Throttle;

/// Lines and their ordered stop sequences.
pub trait LineSource {
    /// List the lines serving any of `modes`.
    fn lines(
        &self,
        modes: &[Mode],
    ) -> impl Future<Output = Result<Vec<LineInfo>, SourceError>> + Send;

    /// Every direction/branch stop sequence of `line`.
    fn route_sequences(
        &self,
        line: &LineId,
    ) -> impl Future<Output = Result<Vec<RouteSequence>, SourceError>> + Send;
}

/// Stops near a coordinate.
pub trait NearbySource {
    fn nearby_stops(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> impl Future<Output = Result<Vec<StopRecord>, SourceError>> + Send;
}

/// Scheduled-interval sequences for a line, starting from a terminal.
pub trait IntervalSource {
    fn intervals(
        &self,
        line: &LineId,
        from: &StationId,
    ) -> impl Future<Output = Result<Vec<IntervalSequence>, SourceError>> + Send;
}

/// Point-to-point journey planning.
pub trait JourneySource {
    fn journeys(
        &self,
        from: &StationId,
        to: &StationId,
        filter: &ModeFilter,
    ) -> impl Future<Output = Result<Vec<Itinerary>, SourceError>> + Send;
}

/// Everything the build pipeline needs from upstream.
pub trait TransitSource: LineSource + NearbySource + IntervalSource + JourneySource {}

impl<S> TransitSource for S where S: LineSource + NearbySource + IntervalSource + JourneySource {}
