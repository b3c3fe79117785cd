use anyhow::{Context, bail};
use aqiroute::air_quality::{AreaAqiLookup, EstimatingLookup, local_hour_clock};
use aqiroute::engine::{
    AqiAggregator, CancelToken, FixedDelayLimiter, HourlyForecaster, RateLimiter,
    SlidingWindowLimiter,
};
use aqiroute::{
    AirError, ApiClient, AqiEstimator, AqiRouteConfig, BreakpointEstimator, CleanAirPlanner,
    ForestEstimator, GraphHopperRouter, HourlyForecast, LocationResolver, OpenMeteoGeocoder,
    OpenWeatherClient, OverpassPoiSource, ParkReport, PlannerSettings, RouteReport,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "aqiroute",
    version,
    about = "Clean-air parks, routes and hourly AQI forecasts"
)]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Score sample points with the local estimator instead of the provider index
    #[arg(long, global = true)]
    estimate_area: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hourly AQI forecast at a location
    Forecast {
        /// Place name or "lat,lon"
        location: String,
        /// Base hour of day (0-23), defaults to now
        #[arg(long)]
        hour: Option<u32>,
        /// Include the base hour in the output
        #[arg(long)]
        include_current: bool,
        /// Number of future hours
        #[arg(long)]
        horizon: Option<u32>,
    },
    /// Cleanest parks around a location
    Parks {
        location: String,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<u32>,
        /// Number of parks to show
        #[arg(long)]
        count: Option<usize>,
    },
    /// Cleanest walking route between two locations
    Route {
        from: String,
        to: String,
        /// Look up every n-th point of each path
        #[arg(long)]
        stride: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        match e.downcast_ref::<AirError>() {
            Some(air) => {
                eprintln!("Error: {}", air.user_message());
                if air.is_transient() {
                    eprintln!("This looks temporary, try again in a moment.");
                }
            }
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = AqiRouteConfig::load_from_path(args.config.clone())?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    apply_overrides(&mut config, &args.command);
    config.validate()?;
    aqiroute::logging::init(&config.logging)?;

    debug!("Configuration: {:?}", config.sampling);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping before the next lookup");
            on_interrupt.cancel();
        }
    });

    let (planner, api) = build_planner(&config, args.estimate_area)?;

    match args.command {
        Command::Forecast { location, hour, .. } => {
            let location = planner.resolve_location(&location).await?;
            let forecast = planner.forecast_at(location.coordinate, hour).await?;
            output(args.json, &forecast, || print_forecast(&location.name, &forecast))?;
        }
        Command::Parks { location, .. } => {
            let location = planner.resolve_location(&location).await?;
            let report = planner
                .cleanest_parks_default(location.coordinate, &cancel)
                .await?;
            output(args.json, &report, || print_parks(&location.name, &report))?;
        }
        Command::Route { from, to, .. } => {
            if config.api.routing_key.is_none() {
                bail!("api.routing_key must be set to plan routes");
            }
            let start = planner.resolve_location(&from).await?;
            let end = planner.resolve_location(&to).await?;
            let report = planner
                .rank_routes(start.coordinate, end.coordinate, &cancel)
                .await?;
            output(args.json, &report, || print_routes(&start.name, &end.name, &report))?;
        }
    }

    info!("External API calls made: {}", api.calls_made());
    Ok(())
}

/// Command-line values take precedence over the file and environment
fn apply_overrides(config: &mut AqiRouteConfig, command: &Command) {
    match command {
        Command::Forecast {
            include_current,
            horizon,
            ..
        } => {
            config.forecast.include_current_hour |= *include_current;
            if let Some(horizon) = horizon {
                config.forecast.forecast_horizon = *horizon;
            }
        }
        Command::Parks { radius, count, .. } => {
            if let Some(radius) = radius {
                config.selection.park_radius_m = *radius;
            }
            if let Some(count) = count {
                config.selection.park_count = *count;
            }
        }
        Command::Route { stride, .. } => {
            if let Some(stride) = stride {
                config.sampling.sample_stride = *stride;
            }
        }
    }
}

fn build_planner(
    config: &AqiRouteConfig,
    estimate_area: bool,
) -> anyhow::Result<(CleanAirPlanner, ApiClient)> {
    let api = ApiClient::new(config.api.timeout())?;

    let pollutant_key = config
        .api
        .pollutant_source_key
        .as_deref()
        .context(
            "api.pollutant_source_key must be set (or AQIROUTE_API__POLLUTANT_SOURCE_KEY)",
        )?;
    let pollutants = Arc::new(OpenWeatherClient::new(
        api.clone(),
        &config.api.pollutant_source_url,
        pollutant_key,
    ));

    let estimator: Arc<dyn AqiEstimator> = match &config.estimator.model_path {
        Some(path) => {
            let forest = ForestEstimator::load(path)
                .with_context(|| format!("Failed to load estimator model {}", path.display()))?;
            info!("Loaded decision forest with {} trees", forest.tree_count());
            Arc::new(forest)
        }
        None => Arc::new(BreakpointEstimator),
    };

    let clock = local_hour_clock();
    let area_lookup: Arc<dyn AreaAqiLookup> = if estimate_area {
        Arc::new(EstimatingLookup::new(
            pollutants.clone(),
            estimator.clone(),
            clock.clone(),
        ))
    } else {
        // same key unless a separate area lookup key is configured
        let key = config.api.effective_area_lookup_key().unwrap_or(pollutant_key);
        Arc::new(OpenWeatherClient::new(
            api.clone(),
            &config.api.pollutant_source_url,
            key,
        ))
    };

    let limiter: Arc<dyn RateLimiter> = match config.sampling.max_requests_per_minute {
        Some(max) => Arc::new(SlidingWindowLimiter::per_minute(max)),
        None => Arc::new(FixedDelayLimiter::new(config.sampling.rate_limit_delay())),
    };

    let planner = CleanAirPlanner::new(
        LocationResolver::new(Arc::new(OpenMeteoGeocoder::new(
            api.clone(),
            &config.api.geocoding_url,
        ))),
        Arc::new(OverpassPoiSource::new(api.clone(), &config.api.poi_url)),
        Arc::new(GraphHopperRouter::new(
            api.clone(),
            &config.api.routing_url,
            config.api.routing_key.clone().unwrap_or_default(),
            config.selection.route_count,
        )),
        pollutants,
        AqiAggregator::new(area_lookup, limiter, config.sampling.lookup_timeout()),
        HourlyForecaster::new(estimator, config.forecast.forecast_horizon),
        clock,
        PlannerSettings {
            sample_stride: config.sampling.sample_stride,
            park_count: config.selection.park_count,
            park_radius_m: config.selection.park_radius_m,
            include_current_hour: config.forecast.include_current_hour,
        },
    );

    Ok((planner, api))
}

fn output<T: Serialize>(json: bool, value: &T, table: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        table();
    }
    Ok(())
}

fn print_forecast(name: &str, forecast: &HourlyForecast) {
    println!("AQI forecast for {name}");
    println!("{:<8} {:<6} Category", "Offset", "Hour");
    for point in &forecast.points {
        println!(
            "{:<8} {:<6} {}",
            format!("+{}h", point.hour_offset),
            format!("{:02}:00", point.hour),
            point.category
        );
    }
    if let Some(worst) = forecast.worst() {
        println!("Worst hour: {worst}");
    }
}

fn print_parks(name: &str, report: &ParkReport) {
    println!(
        "Cleanest parks within {:.1} km of {name} ({} found)",
        f64::from(report.radius_m) / 1000.0,
        report.parks_found
    );
    if report.parks.is_empty() {
        println!("No park could be scored.");
    }
    println!("{:<4} {:<32} {:>8}  AQI", "#", "Park", "Dist km");
    for (i, park) in report.parks.iter().enumerate() {
        let category = park
            .category
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "{:<4} {:<32} {:>8.2}  {category}",
            i + 1,
            park.name,
            park.distance_km
        );
    }
    print_skipped(
        report.aggregation.no_data,
        report.aggregation.failed,
        report.aggregation.timed_out,
    );
}

fn print_routes(from: &str, to: &str, report: &RouteReport) {
    println!("Routes from {from} to {to} ({} found)", report.paths_found);
    if report.routes.is_empty() {
        println!("No route could be scored.");
    }
    println!("{:<4} {:>8} {:>8} {:>10}", "#", "Dist km", "Points", "Mean AQI");
    for (i, route) in report.routes.iter().enumerate() {
        let score = route
            .aggregated_score
            .map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));
        println!(
            "{:<4} {:>8.2} {:>8} {:>10}",
            i + 1,
            route.distance_km,
            route.path.len(),
            score
        );
    }
    let (no_data, failed, timed_out) = report.aggregations.iter().fold((0, 0, 0), |acc, a| {
        (acc.0 + a.no_data, acc.1 + a.failed, acc.2 + a.timed_out)
    });
    print_skipped(no_data, failed, timed_out);
}

fn print_skipped(no_data: usize, failed: usize, timed_out: usize) {
    if no_data + failed + timed_out > 0 {
        println!(
            "Skipped points: {no_data} without data, {failed} failed, {timed_out} timed out"
        );
    }
}
