//! Run configuration, from environment variables (usually set in a `.env` file).
//!
//! Shared by both binaries:
//!   - `VOLUME_CSV` - volume records to read (required)
//!   - `LOCATIONS_CSV` - location table with `id,code,name` headers (required)
//!   - `LOG_DIR` - directory for the log file (default `.`)
//!   - `TIME_ZONE` - zone that counts are reported in (default `US/Central`)
//!
//! `volume_xml` only:
//!   - `OUTPUT_XML` - where to write the interval document (required)
//!   - `BIN_MINUTES` - width of intervals (default 15)
//!   - `START`, `END` - inclusive bounds of records to use, with or without an offset
//!   - `DEDUP` - `true` to remove repeated records
//!   - `ONLY_MAPPED_LOCATIONS` - `true` to leave out records of locations not in the table,
//!     rather than fail
//!   - `AGGREGATED_CSV` - where to also write the aggregated bins
//!   - `ROUTE_FILE` - SUMO routes; when set, the route sampler is run on the document
//!   - `ROUTE_SAMPLER` - the sampler script (default `SUMO_files/routeSampler.py`)
//!   - `PYTHON` - interpreter for the sampler (default `python`)
//!   - `SUMO_CONFIGS` - comma-separated SUMO configuration files to point at the sampled trips
//!
//! `daily_counts` only:
//!   - `DAILY_CSV` - where to write daily totals (required)
//!   - `FIRST_DATE`, `LAST_DATE` - inclusive range of dates, YYYY-MM-DD (required)
//!   - `PROFILE_CSV` - where to write a time-of-day profile of one location
//!   - `PROFILE_LOCATION` - code of that location (required with `PROFILE_CSV`)
//!   - `PROFILE_DATES` - comma-separated dates of the profile (required with `PROFILE_CSV`)
use std::env;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    route_sampler::RouteSampler, time_normalize::TimeNormalizer, BinWidth, VolumeError,
};

const DEFAULT_TIME_ZONE: &str = "US/Central";
const DEFAULT_ROUTE_SAMPLER: &str = "SUMO_files/routeSampler.py";
const DEFAULT_PYTHON: &str = "python";

/// Configuration of the `volume_xml` binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub volume_csv: PathBuf,
    pub locations_csv: PathBuf,
    pub output_xml: PathBuf,
    pub log_dir: PathBuf,
    pub normalizer: TimeNormalizer,
    pub bin_width: BinWidth,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub dedup: bool,
    pub only_mapped_locations: bool,
    pub aggregated_csv: Option<PathBuf>,
    pub route_file: Option<PathBuf>,
    pub route_sampler: RouteSampler,
    pub sumo_configs: Vec<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, VolumeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any source of variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VolumeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let normalizer = normalizer(&lookup)?;

        let bin_width = match optional(&lookup, "BIN_MINUTES") {
            Some(v) => BinWidth::from_minutes(v.parse().map_err(|_| {
                VolumeError::Config(format!("BIN_MINUTES must be a whole number, not `{v}`"))
            })?)?,
            None => BinWidth::default(),
        };

        let start = optional(&lookup, "START")
            .map(|v| normalizer.parse_bound(&v))
            .transpose()?;
        let end = optional(&lookup, "END")
            .map(|v| normalizer.parse_bound(&v))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(VolumeError::Config(format!(
                    "START ({start}) is after END ({end})"
                )));
            }
        }

        Ok(Self {
            volume_csv: required(&lookup, "VOLUME_CSV")?.into(),
            locations_csv: required(&lookup, "LOCATIONS_CSV")?.into(),
            output_xml: required(&lookup, "OUTPUT_XML")?.into(),
            log_dir: log_dir(&lookup),
            normalizer,
            bin_width,
            start,
            end,
            dedup: flag(&lookup, "DEDUP"),
            only_mapped_locations: flag(&lookup, "ONLY_MAPPED_LOCATIONS"),
            aggregated_csv: optional(&lookup, "AGGREGATED_CSV").map(PathBuf::from),
            route_file: optional(&lookup, "ROUTE_FILE").map(PathBuf::from),
            route_sampler: RouteSampler::new(
                optional(&lookup, "PYTHON").unwrap_or_else(|| DEFAULT_PYTHON.to_string()),
                optional(&lookup, "ROUTE_SAMPLER")
                    .unwrap_or_else(|| DEFAULT_ROUTE_SAMPLER.to_string()),
            ),
            sumo_configs: list(&lookup, "SUMO_CONFIGS")
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        })
    }
}

/// Configuration of the `daily_counts` binary.
#[derive(Debug, Clone)]
pub struct DailyConfig {
    pub volume_csv: PathBuf,
    pub locations_csv: PathBuf,
    pub daily_csv: PathBuf,
    pub log_dir: PathBuf,
    pub normalizer: TimeNormalizer,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub profile: Option<ProfileConfig>,
}

/// A time-of-day profile to write alongside the daily totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub csv: PathBuf,
    /// Location code, as in the location table.
    pub location: String,
    pub dates: Vec<NaiveDate>,
}

impl DailyConfig {
    pub fn from_env() -> Result<Self, VolumeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, VolumeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_date = date(&lookup, "FIRST_DATE")?;
        let last_date = date(&lookup, "LAST_DATE")?;
        if first_date > last_date {
            return Err(VolumeError::Config(format!(
                "FIRST_DATE ({first_date}) is after LAST_DATE ({last_date})"
            )));
        }

        let profile = match optional(&lookup, "PROFILE_CSV") {
            Some(csv) => {
                let dates = list(&lookup, "PROFILE_DATES")
                    .iter()
                    .map(|v| parse_date("PROFILE_DATES", v))
                    .collect::<Result<Vec<_>, _>>()?;
                if dates.is_empty() {
                    return Err(VolumeError::Config(
                        "PROFILE_DATES is not set".to_string(),
                    ));
                }
                Some(ProfileConfig {
                    csv: csv.into(),
                    location: required(&lookup, "PROFILE_LOCATION")?,
                    dates,
                })
            }
            None => None,
        };

        Ok(Self {
            volume_csv: required(&lookup, "VOLUME_CSV")?.into(),
            locations_csv: required(&lookup, "LOCATIONS_CSV")?.into(),
            daily_csv: required(&lookup, "DAILY_CSV")?.into(),
            log_dir: log_dir(&lookup),
            normalizer: normalizer(&lookup)?,
            first_date,
            last_date,
            profile,
        })
    }
}

/// A variable's value, treating an empty one as unset.
fn optional<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<String, VolumeError> {
    optional(lookup, key).ok_or_else(|| VolumeError::Config(format!("{key} is not set")))
}

/// The non-empty items of a comma-separated variable.
fn list<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Vec<String> {
    optional(lookup, key)
        .map(|v| {
            v.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn flag<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> bool {
    optional(lookup, key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn log_dir<F: Fn(&str) -> Option<String>>(lookup: &F) -> PathBuf {
    optional(lookup, "LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn normalizer<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<TimeNormalizer, VolumeError> {
    TimeNormalizer::from_name(
        &optional(lookup, "TIME_ZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
    )
}

fn date<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<NaiveDate, VolumeError> {
    parse_date(key, &required(lookup, key)?)
}

fn parse_date(key: &str, v: &str) -> Result<NaiveDate, VolumeError> {
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .map_err(|_| VolumeError::Config(format!("{key} must be YYYY-MM-DD, not `{v}`")))
}
