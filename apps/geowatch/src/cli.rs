//! # CLI Module
//!
//! Command-line interface for Geowatch.
//!
//! - `serve`: run the HTTP server
//! - `distance`: evaluate one point against the fence
//! - `replay`: feed a file of reports through a fresh tracker, offline
//!
//! Fence options (`--home-lat`, `--home-lon`, `--radius`, `--authorized`,
//! `--default-tag`) are global and override the environment.

use crate::api::{self, ServeError};
use crate::config::{Config, ConfigError, ConfigOverrides};
use clap::{Args, Parser, Subcommand};
use geowatch_core::{
    Coordinate, GeoError, GeofenceTracker, NotificationIntent, Report, Verdict, evaluate,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// ARGUMENTS
// =============================================================================

/// Geofence entry alerts from position reports.
#[derive(Parser, Debug)]
#[command(name = "geowatch", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub fence: FenceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Fence settings that override the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct FenceArgs {
    /// Home latitude in decimal degrees [env: GEOWATCH_HOME_LAT]
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub home_lat: Option<f64>,

    /// Home longitude in decimal degrees [env: GEOWATCH_HOME_LON]
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub home_lon: Option<f64>,

    /// Fence radius in meters [env: GEOWATCH_RADIUS_M]
    #[arg(long, global = true)]
    pub radius: Option<f64>,

    /// Comma-separated authorized tags [env: GEOWATCH_AUTHORIZED]
    #[arg(long, global = true)]
    pub authorized: Option<String>,

    /// Tag for reports that omit one [env: GEOWATCH_DEFAULT_TAG]
    #[arg(long, global = true)]
    pub default_tag: Option<String>,
}

impl FenceArgs {
    #[must_use]
    pub fn overrides(&self, port: Option<u16>) -> ConfigOverrides {
        ConfigOverrides {
            home_lat: self.home_lat,
            home_lon: self.home_lon,
            radius_m: self.radius,
            authorized: self.authorized.clone(),
            default_tag: self.default_tag.clone(),
            port,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listening port [env: GEOWATCH_PORT]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Evaluate a single point against the fence
    Distance {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Replay a file of reports through a fresh tracker
    Replay {
        /// Input file
        file: PathBuf,

        /// Input format: json (array of {tag, lat, lon}) or text (tag,lat,lon per line)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("unknown format '{0}' (expected json or text)")]
    UnknownFormat(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Load configuration and run the selected command.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Serve { port } => {
            let config = Config::from_env(&cli.fence.overrides(port))?;
            api::serve(config).await?;
        }
        Commands::Distance { lat, lon, json } => {
            let config = Config::from_env(&cli.fence.overrides(None))?;
            cmd_distance(&config, lat, lon, json)?;
        }
        Commands::Replay { file, format, json } => {
            let config = Config::from_env(&cli.fence.overrides(None))?;
            cmd_replay(&config, &file, &format, json)?;
        }
    }
    Ok(())
}

// =============================================================================
// DISTANCE COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct DistanceOutput {
    lat: f64,
    lon: f64,
    distance_m: f64,
    radius_m: f64,
    within_fence: bool,
}

/// Evaluate one point and print the verdict.
pub fn cmd_distance(config: &Config, lat: f64, lon: f64, json: bool) -> Result<Verdict, CliError> {
    let point = Coordinate::new(lat, lon)?;
    let verdict = evaluate(&config.reference, point);

    if json {
        let output = DistanceOutput {
            lat,
            lon,
            distance_m: verdict.distance_m,
            radius_m: config.reference.radius_m,
            within_fence: verdict.within_fence,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Point:    {}", point);
        println!("Home:     {}", config.reference.location);
        println!("Distance: {:.2} m", verdict.distance_m);
        println!(
            "Verdict:  {} (radius {:.2} m)",
            if verdict.within_fence { "inside" } else { "outside" },
            config.reference.radius_m
        );
    }

    Ok(verdict)
}

// =============================================================================
// REPLAY COMMAND
// =============================================================================

/// One processed report.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayEntry {
    /// 1-based position in the input.
    pub index: usize,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inside: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals for a replay run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub processed: usize,
    pub rejected: usize,
    pub notifications: usize,
    pub entries: Vec<ReplayEntry>,
}

/// Replay reports from `file` through a fresh tracker.
///
/// Invalid reports are counted and skipped; a malformed file aborts.
/// No notification sink is contacted.
pub fn cmd_replay(
    config: &Config,
    file: &Path,
    format: &str,
    json: bool,
) -> Result<ReplaySummary, CliError> {
    let reports = load_reports(file, format)?;
    let tracker = GeofenceTracker::new(config.reference, config.authorized.clone());
    let mut summary = ReplaySummary::default();

    for (i, report) in reports.iter().enumerate() {
        let mut entry = ReplayEntry {
            index: i + 1,
            tag: report.tag.clone(),
            distance_m: None,
            inside: None,
            notification: None,
            error: None,
        };
        match tracker.process(report) {
            Ok(outcome) => {
                summary.processed += 1;
                if outcome.notification.is_some() {
                    summary.notifications += 1;
                }
                entry.distance_m = Some(outcome.distance_m);
                entry.inside = Some(outcome.within_fence);
                entry.notification = outcome.notification;
            }
            Err(e) => {
                summary.rejected += 1;
                entry.error = Some(e.to_string());
            }
        }
        summary.entries.push(entry);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for entry in &summary.entries {
            print_entry(entry);
        }
        println!(
            "Processed {} report(s), rejected {}, {} notification(s)",
            summary.processed, summary.rejected, summary.notifications
        );
    }

    Ok(summary)
}

fn print_entry(entry: &ReplayEntry) {
    match (&entry.error, entry.distance_m, entry.inside) {
        (Some(err), _, _) => println!("#{:<4} {:<16} rejected: {}", entry.index, entry.tag, err),
        (None, Some(distance), Some(inside)) => {
            let state = if inside { "inside" } else { "outside" };
            match &entry.notification {
                Some(intent) => println!(
                    "#{:<4} {:<16} {:>12.2} m  {:<7}  -> {}",
                    entry.index,
                    entry.tag,
                    distance,
                    state,
                    intent.message()
                ),
                None => println!(
                    "#{:<4} {:<16} {:>12.2} m  {}",
                    entry.index, entry.tag, distance, state
                ),
            }
        }
        _ => {}
    }
}

/// Read reports from a file in the given format.
pub fn load_reports(file: &Path, format: &str) -> Result<Vec<Report>, CliError> {
    let content = std::fs::read_to_string(file)?;
    match format {
        "json" => Ok(serde_json::from_str(&content)?),
        "text" => parse_reports_text(&content),
        other => Err(CliError::UnknownFormat(other.to_string())),
    }
}

/// Parse `tag,lat,lon` lines. Blank lines and `#` comments are skipped.
///
/// The tag is everything before the last two commas and is kept verbatim,
/// like tags arriving over HTTP. Coordinate fields are trimmed; an empty one
/// is kept as missing so the tracker rejects that report.
pub fn parse_reports_text(content: &str) -> Result<Vec<Report>, CliError> {
    let mut reports = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = line.rsplitn(3, ',');
        let (Some(lon), Some(lat), Some(tag)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(CliError::Parse {
                line: i + 1,
                reason: format!("expected 'tag,lat,lon', got '{}'", line),
            });
        };

        reports.push(Report {
            tag: tag.to_string(),
            lat: parse_field(i + 1, "lat", lat)?,
            lon: parse_field(i + 1, "lon", lon)?,
        });
    }

    Ok(reports)
}

fn parse_field(line: usize, name: &str, raw: &str) -> Result<Option<f64>, CliError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| CliError::Parse {
        line,
        reason: format!("{} is not numeric: '{}'", name, raw),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_fence_flags() {
        let cli = Cli::try_parse_from([
            "geowatch",
            "distance",
            "--home-lat",
            "-23.4175",
            "--home-lon",
            "29.474083",
            "--lat",
            "-23.4176",
            "--lon",
            "29.4741",
        ])
        .unwrap();

        assert_eq!(cli.fence.home_lat, Some(-23.4175));
        match cli.command {
            Commands::Distance { lat, json, .. } => {
                assert_eq!(lat, -23.4176);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_serve_port() {
        let cli = Cli::try_parse_from(["geowatch", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }

    #[test]
    fn text_parser_skips_comments_and_blanks() {
        let reports = parse_reports_text("# header\n\nphone,1.0,2.0\n").unwrap();
        assert_eq!(reports, vec![Report::new("phone", 1.0, 2.0)]);
    }

    #[test]
    fn text_parser_keeps_commas_in_tag() {
        let reports = parse_reports_text("Smith, J,0,0").unwrap();
        assert_eq!(reports[0].tag, "Smith, J");
    }

    #[test]
    fn text_parser_empty_coordinate_is_missing() {
        let reports = parse_reports_text("phone,,2.0").unwrap();
        assert_eq!(reports[0].lat, None);
    }

    #[test]
    fn text_parser_rejects_short_lines() {
        let err = parse_reports_text("phone,1.0").unwrap_err();
        assert!(matches!(err, CliError::Parse { line: 1, .. }));
    }

    #[test]
    fn text_parser_rejects_non_numeric() {
        let err = parse_reports_text("ok,0,0\nphone,north,2.0").unwrap_err();
        assert!(matches!(err, CliError::Parse { line: 2, .. }));
    }

    #[test]
    fn text_parser_keeps_tag_whitespace() {
        let reports = parse_reports_text("alice ,0, 0 \n alice,1,1").unwrap();
        assert_eq!(reports[0].tag, "alice ");
        assert_eq!(reports[0].lon, Some(0.0));
        assert_eq!(reports[1].tag, " alice");
    }
}
