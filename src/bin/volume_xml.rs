//! Create the turn-count document for SUMO's route sampler from exported volume data.
//!
//! The program reads volume records (see [`VolumeRecord`]) from `VOLUME_CSV`, optionally
//! limits them to the `START`/`END` range, sums them into fixed-width intervals per movement,
//! and writes the interval document to `OUTPUT_XML`. Movements are named after the location
//! codes in `LOCATIONS_CSV`. If `ROUTE_FILE` is set, the route sampler is then run on the
//! document to produce vehicle trips, and the SUMO configurations in `SUMO_CONFIGS` are
//! pointed at them.
//!
//! All settings come from environment variables or a `.env` file; see
//! [`traffic_volume_xml::config`]. A [log][`LOG`] of the run is kept in `LOG_DIR`.
//!
//! A run either writes a complete document or none at all: a bad record, a record of a
//! location with no code, or an empty time range stops it before anything is written. See
//! [`traffic_volume_xml::pipeline::run`].

use std::fs::OpenOptions;
use std::process::ExitCode;

use log::{error, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

use traffic_volume_xml::{config::Config, pipeline};

const LOG: &str = "volume_xml.log";

fn main() -> ExitCode {
    // A .env file is optional; variables may also be set in the environment.
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
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

    match pipeline::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
