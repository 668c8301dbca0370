mod alignment_record;
mod breakpoint_support;
mod cigar_utils;
mod cli;
mod combine;
mod combine_chimera;
mod count_support;
mod globals;
mod logger;
mod original_alignment;
mod os_utils;
mod run_stats;
mod worker_thread_data;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::cli::Commands;
use crate::combine::run_combine;
use crate::count_support::run_count_support;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;

/// Run system configuration steps prior to starting any other program logic
///
fn system_configuration_prelude() {
    os_utils::attempt_max_open_file_limit();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Combine(x) => {
            run_combine(&settings.shared, x)?;
        }
        Commands::CountSupport(x) => {
            run_count_support(&settings.shared, x)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    system_configuration_prelude();

    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        log::error!("{err}");
        process::exit(2);
    }
}
