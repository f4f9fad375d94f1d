//! Turn intersection turning-movement volumes into interval-based edge-relation documents.
//!
//! Volume records (one row per location, timestamp, vehicle class and movement) are read from
//! a file, [normalized][time_normalize] into a civil time zone, [binned][aggregate] into
//! fixed-width intervals per movement, and [serialized][interval_xml] into the `<data>`
//! / `<interval>` / `<edgeRelation>` document consumed by SUMO's route sampler, with each
//! location's movements named by its [short code][locations].
//!
//! The two binaries, `volume_xml` and `daily_counts`, run the [pipeline] from environment
//! [configuration][config].

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod daily;
pub mod extract_from_file;
pub mod interval_xml;
pub mod locations;
pub mod pipeline;
pub mod route_sampler;
pub mod time_normalize;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("no volume records to aggregate")]
    EmptyInput,
    #[error("no code for location `{0}` in the location table")]
    UnknownLocation(String),
    #[error("unable to name movements in interval `{interval}`: no code for location `{location_id}`")]
    UnresolvedLocation {
        location_id: String,
        interval: String,
    },
    #[error("record on line {line} is malformed: {problem:?}")]
    MalformedRecord { line: u64, problem: RecordProblem },
    #[error("bin width of {0} minutes does not evenly divide an hour")]
    InvalidBinWidth(u32),
    #[error("no such time zone `{0}`")]
    InvalidTimeZone(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("route sampler failed: {0}")]
    RouteSampler(String),
    #[error("unable to read or write file: {0}")]
    Io(#[from] io::Error),
    #[error("error reading or writing csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("error writing xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Identifying the problem when a record (or a row of the location table) is malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordProblem {
    MissingField(&'static str),
    InvalidCount(String),
    NegativeCount(i64),
    InvalidIntervalLength(String),
    DuplicateLocationId(String),
    DuplicateLocationCode(String),
}

/// A count of vehicles making one movement through a location during one reporting period.
///
/// `timestamp` is an absolute instant; conversion to a civil zone happens later, in
/// [`time_normalize::TimeNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRecord {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub interval_length_minutes: u32,
    pub vehicle_class: String,
    pub entrance_direction: String,
    pub exit_direction: String,
    pub vehicle_count: u32,
}

impl VolumeRecord {
    /// Create a record, rejecting negative counts and non-positive reporting periods.
    pub fn new(
        location_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        interval_length_minutes: i64,
        vehicle_class: impl Into<String>,
        entrance_direction: impl Into<String>,
        exit_direction: impl Into<String>,
        vehicle_count: i64,
    ) -> Result<Self, RecordProblem> {
        if vehicle_count < 0 {
            return Err(RecordProblem::NegativeCount(vehicle_count));
        }
        let vehicle_count = u32::try_from(vehicle_count)
            .map_err(|_| RecordProblem::InvalidCount(vehicle_count.to_string()))?;

        let interval_length_minutes = match u32::try_from(interval_length_minutes) {
            Ok(v) if v > 0 => v,
            _ => {
                return Err(RecordProblem::InvalidIntervalLength(
                    interval_length_minutes.to_string(),
                ))
            }
        };

        Ok(Self {
            location_id: location_id.into(),
            timestamp,
            interval_length_minutes,
            vehicle_class: vehicle_class.into(),
            entrance_direction: entrance_direction.into(),
            exit_direction: exit_direction.into(),
            vehicle_count,
        })
    }
}

/// Summed vehicle count of one movement at one location during one bin.
///
/// `bin_start` is in the zone the records were normalized to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedBin {
    pub location_id: String,
    pub entrance_direction: String,
    pub exit_direction: String,
    pub bin_start: DateTime<Tz>,
    pub vehicle_count: u64,
}

/// Width of the bins that records are aggregated into.
///
/// Must evenly divide an hour. Clocks change by whole hours, so bins stay aligned on the wall
/// clock and keep a fixed length on both sides of a DST change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWidth(u32);

impl BinWidth {
    const MINUTES_PER_HOUR: u32 = 60;

    pub fn from_minutes(minutes: u32) -> Result<Self, VolumeError> {
        if minutes == 0 || Self::MINUTES_PER_HOUR % minutes != 0 {
            return Err(VolumeError::InvalidBinWidth(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn seconds(self) -> i64 {
        i64::from(self.0) * 60
    }
}

impl Default for BinWidth {
    /// Fifteen minutes.
    fn default() -> Self {
        Self(15)
    }
}

/// Write `contents` to `path` through a sibling `.partial` file that is renamed into place.
///
/// `path` either keeps its old contents or gets all of the new ones.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), VolumeError> {
    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, contents) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    fs::rename(&partial, path)?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
