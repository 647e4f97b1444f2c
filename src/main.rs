use clap::Parser;
use std::process::ExitCode;
use tidydir::cli::{Cli, run_cli};
use tidydir::config::AppConfig;
use tidydir::logging::init_logging;
use tidydir::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    let console_level = if cli.verbose { "info" } else { "warn" };
    if let Err(e) = init_logging(Some(&config.storage.log_path()), console_level) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    match run_cli(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
