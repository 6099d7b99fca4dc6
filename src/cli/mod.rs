//! Define the application's command line interface
use crate::config::Config;
use crate::gps::{Bearing, Location, Trajectory};
use crate::Error;
use chrono::{DateTime, FixedOffset};
use log::debug;
use serde::Deserialize;
use simplelog::LevelFilter;
use std::fs::File;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

mod match_trace;
use match_trace::{match_command, MatchOpts};
mod plan;
use plan::{plan_command, PlanOpts};

static CONFIG_FILE_NAME: &str = "osrm-match.yml";

/// Match GPS trajectories against an OSRM server and print the results as tables
#[derive(Debug, StructOpt)]
#[structopt(name = "osrm-match")]
pub struct Cli {
    /// Set logging level to debug, use a second time (e.g. -vv) to set logging to trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Suppress info logging messages use a second time (e.g. -qq) to hide warnings
    #[structopt(short, long, parse(from_occurrences))]
    quiet: i32,
    /// Configuration file, defaults to osrm-match.yml in the user's config directory
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    cmd: Command,
}

impl Cli {
    /// Return the verbose flag counts as a log level filter
    pub fn verbosity(&self, default: LevelFilter) -> LevelFilter {
        if self.quiet == 1 {
            LevelFilter::Warn
        } else if self.quiet > 1 {
            LevelFilter::Error
        } else if self.verbose == 1 {
            LevelFilter::Debug
        } else if self.verbose > 1 {
            LevelFilter::Trace
        } else {
            default
        }
    }

    /// Read the configuration file given on the command line, or the default one if it exists
    pub fn load_config(&self) -> Result<Config, Error> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => {
                let path = dirs::config_dir()
                    .unwrap_or_else(PathBuf::new)
                    .join(CONFIG_FILE_NAME);
                if !path.exists() {
                    return Ok(Config::default());
                }
                path
            }
        };
        let mut fp = File::open(&path)?;
        Ok(Config::load(&mut fp)?)
    }

    /// Consume options struct and return the result of subcommand execution
    pub fn execute_subcommand(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        self.cmd.execute(config)
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Match a trajectory file and print the tracepoint and route tables as JSON
    #[structopt(name = "match")]
    Match(MatchOpts),
    /// Print the request url of every batch without contacting the server
    #[structopt(name = "plan")]
    Plan(PlanOpts),
}

impl Command {
    /// Consume enum variant and return the result of the command's execution
    fn execute(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Command::Match(opts) => match_command(config, opts),
            Command::Plan(opts) => plan_command(config, opts),
        }
    }
}

/// Point in time given either as unix seconds or as an RFC 3339 string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Epoch(i64),
    Rfc3339(DateTime<FixedOffset>),
}

impl Timestamp {
    fn epoch_seconds(&self) -> i64 {
        match self {
            Timestamp::Epoch(secs) => *secs,
            Timestamp::Rfc3339(dt) => dt.timestamp(),
        }
    }
}

/// One entry of a trajectory file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PointRecord {
    latitude: f64,
    longitude: f64,
    timestamp: Option<Timestamp>,
    bearing: Option<u16>,
    radius: Option<f64>,
}

/// Read a YAML (or JSON) list of points into a trajectory.
///
/// Bearings and radiuses are only used when every point has one, `bearing_range` is applied
/// to all bearings.
fn read_trajectory(path: &Path, bearing_range: u16) -> Result<Trajectory, Error> {
    let fp = File::open(path)?;
    let points: Vec<PointRecord> = serde_yaml::from_reader(fp)?;
    debug!("Read {} points from {:?}", points.len(), path);
    trajectory_from_records(points, bearing_range)
}

fn trajectory_from_records(
    points: Vec<PointRecord>,
    bearing_range: u16,
) -> Result<Trajectory, Error> {
    let locations = points
        .iter()
        .map(|p| {
            Location::new(
                p.latitude,
                p.longitude,
                p.timestamp.as_ref().map(Timestamp::epoch_seconds),
            )
        })
        .collect();
    let mut trajectory = Trajectory::new(locations)?;

    let bearings: Option<Vec<u16>> = points.iter().map(|p| p.bearing).collect();
    match bearings {
        Some(values) => {
            let bearings = values
                .into_iter()
                .map(|v| Bearing::new(v, bearing_range))
                .collect::<Result<Vec<Bearing>, Error>>()?;
            trajectory = trajectory.with_bearings(bearings)?;
        }
        None if points.iter().any(|p| p.bearing.is_some()) => {
            return Err(Error::InvalidInput(
                "either all points or none must have a bearing".to_string(),
            ))
        }
        None => {}
    }

    let radiuses: Option<Vec<f64>> = points.iter().map(|p| p.radius).collect();
    match radiuses {
        Some(values) => trajectory = trajectory.with_radiuses(values)?,
        None if points.iter().any(|p| p.radius.is_some()) => {
            return Err(Error::InvalidInput(
                "either all points or none must have a radius".to_string(),
            ))
        }
        None => {}
    }

    Ok(trajectory)
}
