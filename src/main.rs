use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use cupola::config::Config;
use cupola::orbit::{
    build_propagator, load_catalog_file, parse_catalog, OrbitalElements, PropagatorKind,
    ScenePoint, TleSet, TrackSampler,
};

#[derive(Parser)]
#[command(name = "cupola")]
#[command(about = "ISS orbit propagation")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<String>,
    /// TLE catalog file, overrides the configured one
    #[arg(long, global = true)]
    tle: Option<String>,
    /// Propagation model, overrides the configured one
    #[arg(long, global = true, value_enum)]
    propagator: Option<PropagatorKind>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Position and speed at an instant (now by default)
    Position { at: Option<String> },
    /// Trail of past scene points ending at an instant
    GroundTrack { at: Option<String> },
    /// Predicted scene points after an instant
    FutureTrack { at: Option<String> },
    /// Parse every element set in a catalog file
    Validate { file: String },
}

#[derive(Serialize)]
struct TrackOutput<'a> {
    center: DateTime<Utc>,
    points: &'a [ScenePoint],
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(tle) = &cli.tle {
        config.tle_file = Some(tle.into());
    }
    if let Some(kind) = cli.propagator {
        config.propagator = kind;
    }

    match &cli.command {
        Commands::Position { at } => position(&config, at.as_deref(), cli.json),
        Commands::GroundTrack { at } => track(&config, at.as_deref(), cli.json, false),
        Commands::FutureTrack { at } => track(&config, at.as_deref(), cli.json, true),
        Commands::Validate { file } => validate(file),
    }
}

fn resolve_tle(config: &Config) -> Result<TleSet, String> {
    let Some(path) = &config.tle_file else {
        log::info!("No TLE file configured, using built-in element set");
        return Ok(TleSet::fallback());
    };

    let entries = load_catalog_file(path).map_err(|e| e.to_string())?;
    let entry = match config.norad_id {
        Some(id) => entries.into_iter().find(|e| e.norad_id == id),
        None => entries.into_iter().next(),
    };

    entry
        .map(|e| {
            log::info!("Using {} ({}) from {}", e.name, e.norad_id, path.display());
            e.tle
        })
        .ok_or_else(|| format!("no matching element set in {}", path.display()))
}

fn parse_instant(at: Option<&str>) -> Result<DateTime<Utc>, String> {
    match at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid time {:?}: {}", s, e)),
        None => Ok(Utc::now()),
    }
}

fn position(config: &Config, at: Option<&str>, json: bool) -> ExitCode {
    let result = resolve_tle(config).and_then(|tle| {
        let propagator = build_propagator(config.propagator, &tle).map_err(|e| e.to_string())?;
        let timestamp = parse_instant(at)?;
        let position = propagator.position_at(timestamp).map_err(|e| e.to_string())?;
        Ok((timestamp, position))
    });

    match result {
        Ok((timestamp, position)) if json => {
            print_json(&serde_json::json!({ "timestamp": timestamp, "position": position }))
        }
        Ok((timestamp, position)) => {
            println!("{}", timestamp);
            println!("  latitude:  {:9.4} deg", position.latitude_deg);
            println!("  longitude: {:9.4} deg", position.longitude_deg);
            println!("  altitude:  {:9.2} km", position.altitude_km);
            println!("  speed:     {:9.0} km/h", position.speed_kmh);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn track(config: &Config, at: Option<&str>, json: bool, future: bool) -> ExitCode {
    let sampler = TrackSampler::new(config.scene);
    let result = resolve_tle(config).and_then(|tle| {
        let propagator = build_propagator(config.propagator, &tle).map_err(|e| e.to_string())?;
        let center = parse_instant(at)?;
        let points = if future {
            sampler.future_track(
                &*propagator,
                center,
                config.track.future_duration,
                config.track.future_step,
            )
        } else {
            sampler.ground_track(
                &*propagator,
                center,
                config.track.ground_points,
                config.track.ground_step,
            )
        };
        Ok((center, points))
    });

    match result {
        Ok((center, points)) if json => print_json(&TrackOutput {
            center,
            points: &points,
        }),
        Ok((center, points)) => {
            println!("{} points around {}", points.len(), center);
            for p in &points {
                println!("  {:8.4} {:8.4} {:8.4}", p.x, p.y, p.z);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let content = match std::fs::read_to_string(Path::new(path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let entries = parse_catalog(&content);
    if entries.is_empty() {
        eprintln!("No element sets found");
        return ExitCode::FAILURE;
    }

    let mut failures = 0;
    for (i, entry) in entries.iter().enumerate() {
        match OrbitalElements::from_tle(&entry.tle) {
            Ok(elements) => println!(
                "  {}: {} ({}) epoch {} period {:.1} min",
                i + 1,
                entry.name,
                entry.norad_id,
                elements.epoch(),
                elements.period_seconds() / 60.0
            ),
            Err(e) => {
                failures += 1;
                println!("  {}: {} ({}) invalid: {}", i + 1, entry.name, entry.norad_id, e);
            }
        }
    }

    if failures == 0 {
        println!("Catalog is valid ({} element sets)", entries.len());
        ExitCode::SUCCESS
    } else {
        eprintln!("{} of {} element sets are invalid", failures, entries.len());
        ExitCode::FAILURE
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding JSON: {}", e);
            ExitCode::FAILURE
        }
    }
}
