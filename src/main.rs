use std::process::ExitCode;

use clap::Parser;

use pixelforge::cli::{self, CliArgs};
use pixelforge::logger;
use pixelforge::settings::EngineSettings;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let settings = EngineSettings::load();

    if args.verbose {
        logger::init_stderr(&settings.log_level);
    } else {
        // Initialize session log (overwrites previous session log)
        logger::init(&settings.log_level);
    }

    tracing::debug!("Settings: {:?}", settings);
    cli::run(args)
}
