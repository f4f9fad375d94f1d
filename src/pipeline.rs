//! The runs behind the two binaries.
//!
//! [`run`] is `volume_xml`: records in, interval document (and optionally trips) out.
//! [`run_daily`] is `daily_counts`: records in, daily totals (and optionally a time-of-day
//! profile) out.
use std::fs;

use log::{info, warn};

use crate::{
    aggregate::{aggregate, dedup_records, filter_time_range, retain_locations},
    config::{Config, DailyConfig},
    daily::{daily_totals, time_of_day_profile, write_daily_totals_csv, write_time_of_day_csv},
    extract_from_file::{write_aggregated_csv_file, Extract},
    interval_xml::IntervalDocument,
    locations::LocationCodes,
    route_sampler::update_route_files,
    write_atomically, VolumeError, VolumeRecord,
};

/// Run the pipeline described by `config` and return the document written.
///
/// The document is built before any file is written, so a record that cannot be
/// binned or named leaves no output behind. The aggregated CSV, if wanted, is written before
/// the document and removed again if the document cannot be written.
pub fn run(config: &Config) -> Result<IntervalDocument, VolumeError> {
    let locations = LocationCodes::from_path(&config.locations_csv)?;

    let mut records = VolumeRecord::extract(&config.volume_csv)?;
    if config.only_mapped_locations {
        records = retain_locations(records, locations.ids());
    }
    if config.dedup {
        records = dedup_records(records);
    }
    if config.start.is_some() || config.end.is_some() {
        records = filter_time_range(records, config.start, config.end);
    }

    let bins = aggregate(&records, &config.normalizer, config.bin_width)?;
    let document = IntervalDocument::build(&bins, &locations, config.bin_width)?;

    if let Some(path) = &config.aggregated_csv {
        write_aggregated_csv_file(&bins, path)?;
    }
    if let Err(e) = document.write_file(&config.output_xml) {
        if let Some(path) = &config.aggregated_csv {
            warn!("Removing {path:?}, as the document could not be written.");
            let _ = fs::remove_file(path);
        }
        return Err(e);
    }

    if let Some(route_file) = &config.route_file {
        let trips = config.route_sampler.run(route_file, &config.output_xml)?;
        // SUMO resolves route files relative to the config file.
        let trips_name = trips
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        for sumo_config in &config.sumo_configs {
            update_route_files(sumo_config, &trips_name)?;
        }
    }

    info!("Processing complete.");
    Ok(document)
}

/// Write daily totals for `config`, and the time-of-day profile if one is configured.
///
/// Both are computed before either file is written.
pub fn run_daily(config: &DailyConfig) -> Result<(), VolumeError> {
    let locations = LocationCodes::from_path(&config.locations_csv)?;
    let records = VolumeRecord::extract(&config.volume_csv)?;

    let totals = daily_totals(
        &records,
        &config.normalizer,
        &locations,
        config.first_date,
        config.last_date,
    )?;
    let mut daily_csv = vec![];
    write_daily_totals_csv(&totals, &mut daily_csv)?;

    let mut profile_csv = vec![];
    if let Some(profile) = &config.profile {
        let location_id = locations
            .id_for_code(&profile.location)
            .ok_or_else(|| VolumeError::UnknownLocation(profile.location.clone()))?;
        let volumes =
            time_of_day_profile(&records, &config.normalizer, location_id, &profile.dates);
        if volumes.is_empty() {
            warn!(
                "No records of {} on {:?}; the profile will be empty.",
                profile.location, profile.dates
            );
        }
        write_time_of_day_csv(&volumes, &mut profile_csv)?;
    }

    write_atomically(&config.daily_csv, &daily_csv)?;
    info!("Wrote {} daily totals to {:?}.", totals.len(), config.daily_csv);

    if let Some(profile) = &config.profile {
        write_atomically(&profile.csv, &profile_csv)?;
        info!(
            "Wrote the time-of-day profile of {} to {:?}.",
            profile.location, profile.csv
        );
    }
    Ok(())
}
