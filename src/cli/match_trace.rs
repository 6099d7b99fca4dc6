//! Define the match subcommand
use super::read_trajectory;
use crate::config::Config;
use crate::services::mapmatch;
use crate::tables::{RouteTable, TracepointTable};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use structopt::StructOpt;

/// Snap a trajectory onto the road network and output both result tables
#[derive(Debug, StructOpt)]
pub struct MatchOpts {
    /// YAML or JSON file holding a list of points
    #[structopt(name = "TRAJECTORY", parse(from_os_str))]
    trajectory: PathBuf,
    /// Maximum number of points per request, overrides the configuration file
    #[structopt(short, long)]
    max_matching_size: Option<usize>,
    /// Search range in degrees applied to every bearing
    #[structopt(long, default_value = "45")]
    bearing_range: u16,
    /// name of file to output the tables to, if "-" is used we will write to stdout
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// Pretty print the JSON output
    #[structopt(short, long)]
    pretty: bool,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    tracepoints: &'a TracepointTable,
    routes: &'a RouteTable,
}

pub fn match_command(config: Config, opts: MatchOpts) -> Result<(), Box<dyn std::error::Error>> {
    let service = config.get_matching_handler()?;
    let trajectory = read_trajectory(&opts.trajectory, opts.bearing_range)?;
    let max_size = opts
        .max_matching_size
        .unwrap_or_else(|| config.max_matching_size());

    let (tracepoints, routes) = mapmatch(service.as_ref(), &trajectory, max_size, config.options())?;
    info!(
        "Matched {} of {} points from {:?}",
        tracepoints.iter().filter(|tp| tp.is_matched()).count(),
        tracepoints.len(),
        &opts.trajectory
    );

    let output = MatchOutput {
        tracepoints: &tracepoints,
        routes: &routes,
    };
    match opts.output {
        Some(path) if path.to_string_lossy() != "-" => {
            write_output(File::create(path)?, &output, opts.pretty)?
        }
        _ => {
            let stdout = io::stdout();
            write_output(stdout.lock(), &output, opts.pretty)?
        }
    }

    Ok(())
}

fn write_output<W: Write>(mut writer: W, output: &MatchOutput, pretty: bool) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, output)?;
    } else {
        serde_json::to_writer(&mut writer, output)?;
    }
    writeln!(writer)
}
