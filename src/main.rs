use osrm_match_client::cli::Cli;
use simplelog::{Config, TermLogger, TerminalMode};
use structopt::StructOpt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Cli::from_args();
    let config = opt.load_config()?;
    // stdout is reserved for the command output
    TermLogger::init(
        opt.verbosity(config.log_level()),
        Config::default(),
        TerminalMode::Stderr,
    )?;

    opt.execute_subcommand(config)
}
