//! skychart-bench: CLI tool for running the sky-view engine and collecting
//! diagnostics.
//!
//! Loads a catalog directory (`stars.json`, `boundaries.json`,
//! `lines.json`), recomputes the view for an observer and date, and prints
//! per-stage diagnostics. Useful for:
//!
//! - Measuring recompute cost on a full catalog
//! - Tuning boundary segmentation thresholds
//! - Checking what a screen position hit-tests to at a given zoom
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin skychart-bench -- --lat 51.5 --lon -0.1 [OPTIONS] <DATA_DIR>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use skychart_engine::diagnostics::{Clock, RecomputeDiagnostics};
use skychart_engine::{
    Catalog, EngineConfig, MeanSiderealEphemeris, Observer, Point, SkyEngine,
};

/// Default magnitude limit: naked-eye stars.
const DEFAULT_MAGNITUDE_LIMIT: f64 = 6.0;

/// Sky-view engine diagnostics for skychart.
///
/// Loads a catalog, recomputes the view for an observer and date, and
/// prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "skychart-bench", version)]
struct Cli {
    /// Directory holding `stars.json`, `boundaries.json` and `lines.json`.
    data_dir: PathBuf,

    /// Observer latitude in degrees (north positive).
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Observer longitude in degrees (east positive).
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Observer elevation in meters.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    elevation: f64,

    /// Observation time as RFC 3339 (defaults to now).
    #[arg(long)]
    date: Option<String>,

    /// Faintest magnitude included in the visible list.
    #[arg(long, default_value_t = DEFAULT_MAGNITUDE_LIMIT, allow_negative_numbers = true)]
    limit: f64,

    /// Altitude floor in degrees for an object to be in view.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_MIN_ALTITUDE, allow_negative_numbers = true)]
    min_altitude: f64,

    /// Altitude below which boundary points break the outline.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_BOUNDARY_HORIZON_CUTOFF, allow_negative_numbers = true)]
    boundary_cutoff: f64,

    /// Display distance that breaks a boundary.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_BOUNDARY_GAP_THRESHOLD)]
    gap_threshold: f64,

    /// Reject catalogs whose region boundaries overlap.
    #[arg(long)]
    reject_overlaps: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other engine parameter flags are ignored.
    /// The JSON must be a valid `EngineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Number of brightest visible objects to list.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Zoom to this scale around the display center before hit-testing.
    #[arg(long)]
    zoom: Option<f64>,

    /// Pan by this screen offset after zooming.
    #[arg(long, num_args = 2, value_names = ["DX", "DY"], allow_negative_numbers = true)]
    pan: Option<Vec<f64>>,

    /// Hit-test this screen point.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    hit: Option<Vec<f64>>,

    /// Screen radius for picking an object at the hit point.
    #[arg(long, default_value_t = 8.0)]
    pick_radius: f64,

    /// Log level filter (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EngineConfig {
        min_altitude: cli.min_altitude,
        boundary_horizon_cutoff: cli.boundary_cutoff,
        boundary_gap_threshold: cli.gap_threshold,
        reject_overlapping_regions: cli.reject_overlaps,
        ..EngineConfig::default()
    })
}

fn date_from_cli(cli: &Cli) -> Result<DateTime<Utc>, String> {
    cli.date.as_ref().map_or_else(
        || Ok(Utc::now()),
        |s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| format!("Error parsing --date {s:?}: {e}"))
        },
    )
}

fn setup_logging(level: &str) -> Result<LoggerHandle, String> {
    Logger::try_with_str(level)
        .and_then(|logger| logger.log_to_stderr().start())
        .map_err(|e| format!("Logger initialization failed: {e}"))
}

fn read_file(dir: &Path, name: &str) -> Result<Vec<u8>, String> {
    let path = dir.join(name);
    std::fs::read(&path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn load_catalog(dir: &Path, config: &EngineConfig) -> Result<Catalog, String> {
    let stars = read_file(dir, "stars.json")?;
    let boundaries = read_file(dir, "boundaries.json")?;
    let lines = read_file(dir, "lines.json")?;
    Catalog::from_json(&stars, &boundaries, &lines, config).map_err(|e| format!("Catalog error: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match setup_logging(&cli.log_level) {
        Ok(handle) => handle,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let date = match date_from_cli(&cli) {
        Ok(d) => d,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let observer = match Observer::new(cli.lat, cli.lon, cli.elevation) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = match SkyEngine::new(MeanSiderealEphemeris, observer, config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Engine error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let catalog = match load_catalog(&cli.data_dir, engine.config()) {
        Ok(catalog) => catalog,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Catalog: {} ({} stars, {} boundary outlines, {} line pairs)",
        cli.data_dir.display(),
        catalog.len(),
        catalog.boundaries().len(),
        catalog.lines().len(),
    );
    eprintln!("Observer: {observer:?}");
    eprintln!("Date: {}", date.to_rfc3339());
    eprintln!("Config: {:#?}", engine.config());
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    engine.replace_catalog(catalog);

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (state, diagnostics) = engine.recompute_with_diagnostics(date, cli.limit, &StdClock);
        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
            if run == 0 && cli.top > 0 {
                println!();
                println!("Brightest visible:");
                for object in state.visible().iter().take(cli.top) {
                    println!(
                        "  {:<24} mag {:>5.2}  alt {:>5.1}  az {:>5.1}",
                        object.display_name, object.magnitude, object.altitude, object.azimuth,
                    );
                }
            }
        }
        log::debug!(
            "run {} finished in {:?}",
            run + 1,
            diagnostics.total_duration
        );
        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    if let Some(ref hit) = cli.hit {
        run_hit_test(&mut engine, &cli, hit);
    }

    ExitCode::SUCCESS
}

/// Apply `--zoom`/`--pan` and print what the hit point resolves to.
fn run_hit_test(engine: &mut SkyEngine<MeanSiderealEphemeris>, cli: &Cli, hit: &[f64]) {
    let &[x, y] = hit else {
        return;
    };
    let center = engine.config().display_center;
    let camera = engine.camera_mut();
    if let Some(scale) = cli.zoom {
        camera.zoom_to(Point::new(center, center), scale);
    }
    if let Some(&[dx, dy]) = cli.pan.as_deref() {
        if camera.begin_pan() {
            camera.pan_by(Point::new(dx, dy));
            camera.end_pan();
        } else {
            eprintln!("Pan ignored at minimum scale");
        }
    }

    let screen = Point::new(x, y);
    let region = engine.region_at_screen(screen);
    let object = engine.object_at_screen(screen, cli.pick_radius);
    let transform = engine.camera().transform();

    if cli.json {
        let result = serde_json::json!({
            "screen": screen,
            "camera": transform,
            "world": engine.camera().screen_to_world(screen),
            "region": region,
            "object": object,
        });
        println!("{result:#}");
    } else {
        println!();
        println!(
            "Hit ({x:.1}, {y:.1}) at k={:.2}: region {}",
            transform.k,
            region.map_or_else(|| "none".to_owned(), |r| format!("{r} ({})", r.latin_name())),
        );
        if let Some(object) = object {
            println!(
                "  nearest object: {} (HIP {}, mag {:.2})",
                object.display_name, object.id, object.magnitude
            );
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&RecomputeDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RecomputeDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(32));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Projection", |d| d.projection.duration),
        ("Segmentation", |d| d.segmentation.duration),
        ("Indexing", |d| d.indexing.duration),
        ("Connectors", |d| d.connectors.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<16} {stage_mean:>10.3}ms");
    }
}
