//! Transit Unified API HTTP client.
//!
//! Provides async methods for the line, stop-point, timetable and journey
//! endpoints. Every request goes through the shared throttle, a concurrency
//! semaphore and the retry policy, and carries a fixed timeout.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::domain::{LineId, Mode, StationId};

use super::convert::{
    convert_journeys, convert_lines, convert_route_sequence, convert_stop_points,
    convert_timetable,
};
use super::error::SourceError;
use super::records::{
    IntervalSequence, Itinerary, LineInfo, ModeFilter, RouteSequence, StopRecord,
};
use super::retry::RetryPolicy;
use super::throttle::Throttle;
use super::types::{
    JourneyResultsDto, LineDto, RouteSequenceDto, StopPointsResponseDto, TimetableResponseDto,
};
use super::{IntervalSource, JourneySource, LineSource, NearbySource};

/// Default base URL for the Unified API.
const DEFAULT_BASE_URL: &str = "https://api.tfl.gov.uk";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Stop types considered by the nearby search.
const NEARBY_STOP_TYPES: &str = "NaptanMetroStation,NaptanRailStation";

/// Configuration for the transit client.
#[derive(Debug, Clone)]
pub struct TransitConfig {
    /// Application key, sent as the `app_key` query parameter
    pub app_key: Option<String>,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum delay between any two requests
    pub min_interval: Duration,
    /// Retry policy for failed requests
    pub retry: RetryPolicy,
}

impl TransitConfig {
    /// Create a new config with the given app key.
    pub fn new(app_key: Option<String>) -> Self {
        Self {
            app_key: app_key.filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            min_interval: Duration::from_millis(250),
            retry: RetryPolicy::default(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Unified API client.
#[derive(Debug, Clone)]
pub struct TransitClient {
    http: reqwest::Client,
    base_url: String,
    app_key: Option<String>,
    semaphore: Arc<Semaphore>,
    throttle: Arc<Throttle>,
    retry: RetryPolicy,
}

impl TransitClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TransitConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_key: config.app_key,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            throttle: Arc::new(Throttle::new(config.min_interval)),
            retry: config.retry,
        })
    }

    /// GET `path` with retries and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        self.retry
            .run(path, || self.get_once::<T>(&url, query))
            .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;
        self.throttle.wait().await;

        let mut request = self.http.get(url).query(query);
        if let Some(key) = &self.app_key {
            request = request.query(&[("app_key", key)]);
        }

        trace!(url, "Transit API request");
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Unauthorized);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| SourceError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

fn join_modes(modes: &[Mode]) -> String {
    modes
        .iter()
        .map(Mode::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

impl LineSource for TransitClient {
    async fn lines(&self, modes: &[Mode]) -> Result<Vec<LineInfo>, SourceError> {
        let path = format!("/Line/Mode/{}", join_modes(modes));
        let lines: Vec<LineDto> = self.get_json(&path, &[]).await?;
        Ok(convert_lines(lines))
    }

    async fn route_sequences(&self, line: &LineId) -> Result<Vec<RouteSequence>, SourceError> {
        let path = format!("/Line/{}/Route/Sequence/all", line.as_str());
        let dto: RouteSequenceDto = self
            .get_json(&path, &[("excludeCrowding", "true".to_string())])
            .await?;
        convert_route_sequence(&dto).map_err(|e| SourceError::Json {
            message: e.to_string(),
            body: None,
        })
    }
}

impl NearbySource for TransitClient {
    async fn nearby_stops(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<StopRecord>, SourceError> {
        let dto: StopPointsResponseDto = self
            .get_json(
                "/StopPoint",
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("radius", format!("{}", radius_m.round() as u64)),
                    ("stopTypes", NEARBY_STOP_TYPES.to_string()),
                ],
            )
            .await?;
        Ok(convert_stop_points(dto))
    }
}

impl IntervalSource for TransitClient {
    async fn intervals(
        &self,
        line: &LineId,
        from: &StationId,
    ) -> Result<Vec<IntervalSequence>, SourceError> {
        let path = format!("/Line/{}/Timetable/{}", line.as_str(), from.as_str());
        let dto: TimetableResponseDto = self.get_json(&path, &[]).await?;
        Ok(convert_timetable(dto))
    }
}

impl JourneySource for TransitClient {
    async fn journeys(
        &self,
        from: &StationId,
        to: &StationId,
        filter: &ModeFilter,
    ) -> Result<Vec<Itinerary>, SourceError> {
        let path = format!(
            "/Journey/JourneyResults/{}/to/{}",
            from.as_str(),
            to.as_str()
        );
        let mode = match filter {
            ModeFilter::Modes(modes) => join_modes(modes),
            ModeFilter::WalkingOnly => Mode::walking().as_str().to_string(),
        };
        let dto: JourneyResultsDto = self.get_json(&path, &[("mode", mode)]).await?;
        Ok(convert_journeys(dto))
    }
}
