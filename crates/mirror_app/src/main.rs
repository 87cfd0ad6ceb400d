mod config;
mod persistence;
mod run;

use std::process::ExitCode;

use clap::Parser;
use mirror_logging::{mirror_error, mirror_info};

use crate::config::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    mirror_logging::initialize(&cli.log_destination(), cli.log_level);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            mirror_error!("Failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run::execute(&cli)) {
        Ok(report) => {
            mirror_info!(
                "Finished: {} downloaded, {} not found, {} failed",
                report.success,
                report.not_found,
                report.failed()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            mirror_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
