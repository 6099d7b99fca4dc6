//! Define the plan subcommand
use super::read_trajectory;
use crate::config::Config;
use crate::services::plan_requests;
use std::path::PathBuf;
use structopt::StructOpt;

/// Show how a trajectory would be split into requests
#[derive(Debug, StructOpt)]
pub struct PlanOpts {
    /// YAML or JSON file holding a list of points
    #[structopt(name = "TRAJECTORY", parse(from_os_str))]
    trajectory: PathBuf,
    /// Maximum number of points per request, overrides the configuration file
    #[structopt(short, long)]
    max_matching_size: Option<usize>,
    /// Search range in degrees applied to every bearing
    #[structopt(long, default_value = "45")]
    bearing_range: u16,
}

pub fn plan_command(config: Config, opts: PlanOpts) -> Result<(), Box<dyn std::error::Error>> {
    let service = config.get_matching_handler()?;
    let trajectory = read_trajectory(&opts.trajectory, opts.bearing_range)?;
    let max_size = opts
        .max_matching_size
        .unwrap_or_else(|| config.max_matching_size());

    for request in plan_requests(service.as_ref(), &trajectory, max_size, config.options())? {
        println!("{}", request);
    }

    Ok(())
}
