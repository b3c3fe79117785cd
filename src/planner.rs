//! Clean-air planning service
//!
//! Wires the collaborators (geocoder, park and path sources, pollutant
//! source, area lookup) into the sampler, aggregator, selector and
//! forecaster.

use crate::air_quality::{HourClock, PollutantSource};
use crate::engine::{
    AggregationReport, AqiAggregator, CancelToken, HourlyForecaster, sample_path, sample_pois,
    select_top_k,
};
use crate::location_resolver::LocationResolver;
use crate::models::{
    AqiCategory, Coordinate, HourlyForecast, Location, ParkCandidate, RouteCandidate,
};
use crate::parks::PoiSource;
use crate::routing::PathSource;
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Cleanest parks around a center
#[derive(Debug, Clone, Serialize)]
pub struct ParkReport {
    pub center: Coordinate,
    pub radius_m: u32,
    /// Parks the POI source returned
    pub parks_found: usize,
    /// Best parks, cleanest first
    pub parks: Vec<ParkCandidate>,
    pub aggregation: AggregationReport,
}

/// Candidate routes ranked by mean AQI
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub start: Coordinate,
    pub end: Coordinate,
    /// Paths the router returned
    pub paths_found: usize,
    /// Scored routes, cleanest first
    pub routes: Vec<RouteCandidate>,
    /// One report per routed path, in router order
    pub aggregations: Vec<AggregationReport>,
}

impl RouteReport {
    #[must_use]
    pub fn best(&self) -> Option<&RouteCandidate> {
        self.routes.first()
    }
}

/// Planner settings taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct PlannerSettings {
    pub sample_stride: usize,
    pub park_count: usize,
    pub park_radius_m: u32,
    pub include_current_hour: bool,
}

pub struct CleanAirPlanner {
    resolver: LocationResolver,
    pois: Arc<dyn PoiSource>,
    paths: Arc<dyn PathSource>,
    pollutants: Arc<dyn PollutantSource>,
    aggregator: AqiAggregator,
    forecaster: HourlyForecaster,
    clock: HourClock,
    settings: PlannerSettings,
}

impl CleanAirPlanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: LocationResolver,
        pois: Arc<dyn PoiSource>,
        paths: Arc<dyn PathSource>,
        pollutants: Arc<dyn PollutantSource>,
        aggregator: AqiAggregator,
        forecaster: HourlyForecaster,
        clock: HourClock,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            resolver,
            pois,
            paths,
            pollutants,
            aggregator,
            forecaster,
            clock,
            settings,
        }
    }

    /// Coordinates or a place name to a location
    pub async fn resolve_location(&self, text: &str) -> Result<Location> {
        self.resolver.resolve(text).await
    }

    /// Hourly forecast from the current pollutant snapshot at `coordinate`.
    ///
    /// `base_hour` defaults to the clock's current hour.
    #[instrument(skip(self))]
    pub async fn forecast_at(
        &self,
        coordinate: Coordinate,
        base_hour: Option<u32>,
    ) -> Result<HourlyForecast> {
        let base_hour = base_hour.unwrap_or_else(|| (self.clock)());
        let snapshot = self.pollutants.fetch_pollutants(coordinate).await?;
        let points =
            self.forecaster
                .forecast(&snapshot, base_hour, self.settings.include_current_hour)?;

        info!(
            "Forecast for {}: {} hours from {:02}:00",
            coordinate.format_coordinates(),
            points.len(),
            base_hour
        );

        Ok(HourlyForecast {
            coordinate,
            base_hour,
            points,
            generated_at: Utc::now(),
        })
    }

    /// Estimated category for the current hour
    pub async fn current_aqi(&self, coordinate: Coordinate) -> Result<AqiCategory> {
        let snapshot = self.pollutants.fetch_pollutants(coordinate).await?;
        self.forecaster.estimate_at(&snapshot, (self.clock)())
    }

    /// Top `k` parks within `radius_m` of `center`, cleanest first.
    ///
    /// Each park is looked up once; parks without a category are left out
    /// of the ranking but still counted in the aggregation report.
    #[instrument(skip(self, cancel))]
    pub async fn cleanest_parks(
        &self,
        center: Coordinate,
        radius_m: u32,
        k: usize,
        cancel: &CancelToken,
    ) -> Result<ParkReport> {
        cancel.check()?;
        let parks = sample_pois(&self.pois.find_nearby(center, radius_m).await?);
        if parks.is_empty() {
            warn!("No parks within {}m of {}", radius_m, center.format_coordinates());
        }

        let coordinates: Vec<Coordinate> = parks.iter().map(|p| p.coordinate).collect();
        let aggregation = self.aggregator.score_points(&coordinates, cancel).await?;

        let candidates = parks
            .iter()
            .zip(&aggregation.points)
            .map(|(park, point)| ParkCandidate {
                name: park.name.clone(),
                coordinate: park.coordinate,
                distance_km: center.distance_km(&park.coordinate),
                category: point.category,
            });
        let ranked = select_top_k(candidates, k);

        info!(
            "Ranked {} of {} parks near {}",
            ranked.len(),
            parks.len(),
            center.format_coordinates()
        );

        Ok(ParkReport {
            center,
            radius_m,
            parks_found: parks.len(),
            parks: ranked,
            aggregation,
        })
    }

    /// Parks with the configured radius and count
    pub async fn cleanest_parks_default(
        &self,
        center: Coordinate,
        cancel: &CancelToken,
    ) -> Result<ParkReport> {
        self.cleanest_parks(
            center,
            self.settings.park_radius_m,
            self.settings.park_count,
            cancel,
        )
        .await
    }

    /// Every routed path scored by its sampled mean AQI, cleanest first.
    /// Paths with no scored sample are dropped from `routes`.
    #[instrument(skip(self, cancel))]
    pub async fn rank_routes(
        &self,
        start: Coordinate,
        end: Coordinate,
        cancel: &CancelToken,
    ) -> Result<RouteReport> {
        cancel.check()?;
        let routed = self.paths.route(start, end).await?;

        let mut candidates = Vec::with_capacity(routed.len());
        let mut aggregations = Vec::with_capacity(routed.len());
        for (i, routed_path) in routed.into_iter().enumerate() {
            let samples = sample_path(&routed_path.path, self.settings.sample_stride);
            let aggregation = self.aggregator.score_points(&samples, cancel).await?;
            info!(
                route = i,
                samples = samples.len(),
                "Route score: {}",
                aggregation
                    .score
                    .map_or_else(|| "no data".to_string(), |s| format!("{s:.2}"))
            );
            candidates.push(RouteCandidate {
                path: routed_path.path,
                distance_km: routed_path.distance_km,
                aggregated_score: aggregation.score,
            });
            aggregations.push(aggregation);
        }

        let paths_found = candidates.len();
        let routes = select_top_k(candidates, paths_found);

        Ok(RouteReport {
            start,
            end,
            paths_found,
            routes,
            aggregations,
        })
    }

    /// Cleanest routed path, `None` when no path could be scored
    pub async fn cleanest_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        cancel: &CancelToken,
    ) -> Result<Option<RouteCandidate>> {
        let report = self.rank_routes(start, end, cancel).await?;
        Ok(report.routes.into_iter().next())
    }
}
