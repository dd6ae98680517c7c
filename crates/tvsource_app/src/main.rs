mod cli;
mod config;
mod logging;
mod progress;
mod run;

use std::process::ExitCode;

use clap::Parser;

use engine_logging::{engine_error, engine_info, engine_warn};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::logging::LogDestination;

const EXIT_RUN_FAILED: u8 = 1;
const EXIT_BAD_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };
    config.apply_cli(&cli);

    let level = if cli.verbose {
        engine_logging::default_level(true)
    } else {
        config
            .log_level()
            .unwrap_or_else(|| engine_logging::default_level(false))
    };
    logging::initialize(LogDestination::from_flag(cli.log_file), level);

    let limits = match config.validate() {
        Ok(limits) => limits,
        Err(err) => {
            engine_error!("invalid configuration: {:#}", err);
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };
    let channels = config.channels(&cli.channels);
    if channels.is_empty() {
        engine_error!("no channels to process");
        return ExitCode::from(EXIT_BAD_CONFIG);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            engine_error!("failed to start async runtime: {}", err);
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    match runtime.block_on(run::run(&config, &channels, limits)) {
        Ok(exported) => {
            let summary = &exported.summary;
            engine_info!(
                "done: {} channel(s), {} with sources, {} source(s) in total",
                summary.channel_count,
                summary.channels_with_sources,
                summary.total_sources
            );
            if summary.is_empty() {
                engine_warn!("no playable sources were found for any channel");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("run failed: {:#}", err);
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}
