//! Sum exported volume records into daily totals per location.
//!
//! Reads `VOLUME_CSV`, totals each location's counts per local date from `FIRST_DATE` through
//! `LAST_DATE`, and writes them, labelled with the location names in `LOCATIONS_CSV`, to
//! `DAILY_CSV`. If `PROFILE_CSV` is set, the volume of the location coded `PROFILE_LOCATION`
//! at each time of day on each of `PROFILE_DATES` is also written there. See
//! [`traffic_volume_xml::config`] for all settings.

use std::fs::OpenOptions;
use std::process::ExitCode;

use log::{error, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

use traffic_volume_xml::{config::DailyConfig, pipeline};

const LOG: &str = "daily_counts.log";

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match DailyConfig::from_env() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Set up logging, panic if it fails.
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Debug,
            log_config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Info,
            log_config,
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(config.log_dir.join(LOG))
                .expect("Could not open log file."),
        ),
    ])
    .expect("Could not configure logging.");

    match pipeline::run_daily(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
