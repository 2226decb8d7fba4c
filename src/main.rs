use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use meteobr::clock::{Clock, SystemClock};
use meteobr::input::resolve_target;
use meteobr::{
    FjallStore, ForecastContext, ForecastService, MeteoConfig, OpenMeteoProfile, OpenMeteoSource,
    ServiceSettings, StaticCatalog, TtlCache, VERSION, telemetry,
};

const USAGE: &str = "usage: meteobr [--detailed] [--date YYYY-MM-DD] [--time HH:MM] <ibge-code>...";

struct Args {
    detailed: bool,
    date: Option<String>,
    time: Option<String>,
    ids: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        detailed: false,
        date: None,
        time: None,
        ids: Vec::new(),
    };
    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--detailed" => args.detailed = true,
            "--date" => args.date = Some(raw.next().context("--date needs a value")?),
            "--time" => args.time = Some(raw.next().context("--time needs a value")?),
            "-h" | "--help" => bail!(USAGE),
            _ => args.ids.push(arg),
        }
    }
    if args.ids.is_empty() {
        bail!(USAGE);
    }
    Ok(args)
}

fn build_service(config: &MeteoConfig, clock: Arc<dyn Clock>) -> Result<ForecastService> {
    let catalog = StaticCatalog::from_json_file(&config.catalog.path)?;

    let cache = if config.cache.enabled {
        match FjallStore::open(&config.cache.path) {
            Ok(store) => TtlCache::new(Arc::new(store), clock.clone(), config.cache.ttl_jitter),
            Err(err) => {
                warn!("Cache unavailable, continuing without it: {:#}", err);
                TtlCache::disabled(clock.clone())
            }
        }
    } else {
        TtlCache::disabled(clock.clone())
    };

    let timeout = Duration::from_secs(u64::from(config.sources.timeout_seconds));
    let primary = OpenMeteoSource::new(OpenMeteoProfile {
        name: "openmeteo".to_string(),
        base_url: config.sources.base_url.clone(),
        forecast_days: config.sources.primary_forecast_days,
        rich_variables: false,
        timeout,
    })?;

    let mut ctx = ForecastContext::new(
        Arc::new(catalog),
        Arc::new(primary),
        cache,
        clock,
        ServiceSettings::from(config),
    );
    if config.sources.extended_enabled {
        let extended = OpenMeteoSource::new(OpenMeteoProfile {
            name: "openmeteo16".to_string(),
            base_url: config.sources.base_url.clone(),
            forecast_days: config.sources.extended_forecast_days,
            rich_variables: true,
            timeout,
        })?;
        ctx = ctx.with_extended(Arc::new(extended));
    }

    Ok(ForecastService::new(Arc::new(ctx)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = MeteoConfig::load()?;
    telemetry::init(&config.logging)?;
    info!("Starting meteobr v{}", VERSION);

    let args = parse_args()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = build_service(&config, clock.clone())?;
    let target = resolve_target(args.date.as_deref(), args.time.as_deref(), clock.now())?;

    let output = if args.detailed {
        let mut aggregates = Vec::with_capacity(args.ids.len());
        for id in &args.ids {
            aggregates.push(service.get_detailed(id, target).await?);
        }
        serde_json::to_string_pretty(&aggregates)?
    } else if let [id] = args.ids.as_slice() {
        serde_json::to_string_pretty(&service.get_current(id, target).await?)?
    } else {
        serde_json::to_string_pretty(&service.get_regional(&args.ids, target).await?)?
    };

    println!("{output}");
    Ok(())
}
