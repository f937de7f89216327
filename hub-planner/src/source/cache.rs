//! Caching layer for transit source responses.
//!
//! Static network data (route sequences, timetables, nearby stops, journey
//! results) changes rarely, so responses are cached for the lifetime of a
//! `CachedSource` with an age-based expiry. Only successful responses are
//! cached; failures are retried by the next caller.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{LineId, Mode, StationId};

use super::error::SourceError;
use super::records::{IntervalSequence, Itinerary, LineInfo, ModeFilter, RouteSequence, StopRecord};
use super::{IntervalSource, JourneySource, LineSource, NearbySource};

/// Nearby-stop key: coordinates in micro-degrees and the radius in metres.
type NearbyKey = (i64, i64, u32);

type JourneyKey = (StationId, StationId, ModeFilter);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age after which an entry is refetched.
    pub ttl: Duration,

    /// Maximum number of cached entries per endpoint.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 20_000,
        }
    }
}

fn build_cache<K, V>(config: &CacheConfig) -> MokaCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    MokaCache::builder()
        .time_to_live(config.ttl)
        .max_capacity(config.max_capacity)
        .build()
}

fn nearby_key(lat: f64, lon: f64, radius_m: f64) -> NearbyKey {
    (
        (lat * 1e6).round() as i64,
        (lon * 1e6).round() as i64,
        radius_m.round() as u32,
    )
}

/// A transit source with response caching.
///
/// Wraps any source and caches each endpoint separately.
pub struct CachedSource<S> {
    inner: S,
    lines: MokaCache<Vec<Mode>, Arc<Vec<LineInfo>>>,
    sequences: MokaCache<LineId, Arc<Vec<RouteSequence>>>,
    nearby: MokaCache<NearbyKey, Arc<Vec<StopRecord>>>,
    intervals: MokaCache<(LineId, StationId), Arc<Vec<IntervalSequence>>>,
    journeys: MokaCache<JourneyKey, Arc<Vec<Itinerary>>>,
}

impl<S> CachedSource<S> {
    /// Create a new cached source.
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        Self {
            inner,
            lines: build_cache(config),
            sequences: build_cache(config),
            nearby: build_cache(config),
            intervals: build_cache(config),
            journeys: build_cache(config),
        }
    }
}

impl<S: LineSource + Send + Sync> LineSource for CachedSource<S> {
    async fn lines(&self, modes: &[Mode]) -> Result<Vec<LineInfo>, SourceError> {
        let key = modes.to_vec();
        if let Some(cached) = self.lines.get(&key).await {
            return Ok(cached.as_ref().clone());
        }
        let lines = self.inner.lines(modes).await?;
        self.lines.insert(key, Arc::new(lines.clone())).await;
        Ok(lines)
    }

    async fn route_sequences(&self, line: &LineId) -> Result<Vec<RouteSequence>, SourceError> {
        if let Some(cached) = self.sequences.get(line).await {
            return Ok(cached.as_ref().clone());
        }
        let sequences = self.inner.route_sequences(line).await?;
        self.sequences
            .insert(line.clone(), Arc::new(sequences.clone()))
            .await;
        Ok(sequences)
    }
}

impl<S: NearbySource + Send + Sync> NearbySource for CachedSource<S> {
    async fn nearby_stops(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<StopRecord>, SourceError> {
        let key = nearby_key(lat, lon, radius_m);
        if let Some(cached) = self.nearby.get(&key).await {
            return Ok(cached.as_ref().clone());
        }
        let stops = self.inner.nearby_stops(lat, lon, radius_m).await?;
        self.nearby.insert(key, Arc::new(stops.clone())).await;
        Ok(stops)
    }
}

impl<S: IntervalSource + Send + Sync> IntervalSource for CachedSource<S> {
    async fn intervals(
        &self,
        line: &LineId,
        from: &StationId,
    ) -> Result<Vec<IntervalSequence>, SourceError> {
        let key = (line.clone(), from.clone());
        if let Some(cached) = self.intervals.get(&key).await {
            return Ok(cached.as_ref().clone());
        }
        let sequences = self.inner.intervals(line, from).await?;
        self.intervals.insert(key, Arc::new(sequences.clone())).await;
        Ok(sequences)
    }
}

impl<S: JourneySource + Send + Sync> JourneySource for CachedSource<S> {
    async fn journeys(
        &self,
        from: &StationId,
        to: &StationId,
        filter: &ModeFilter,
    ) -> Result<Vec<Itinerary>, SourceError> {
        let key = (from.clone(), to.clone(), filter.clone());
        if let Some(cached) = self.journeys.get(&key).await {
            return Ok(cached.as_ref().clone());
        }
        let itineraries = self.inner.journeys(from, to, filter).await?;
        self.journeys
            .insert(key, Arc::new(itineraries.clone()))
            .await;
        Ok(itineraries)
    }
}
