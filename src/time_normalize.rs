//! Convert instants into the civil time zone that counts are reported in.
//!
//! Source timestamps are absolute instants (they carry a UTC offset or marker). Converting an
//! instant to civil time is always well defined; going the other way is not, so
//! [`TimeNormalizer::localize`] applies a fixed policy around DST transitions:
//!  * a civil time that occurs twice (the hour repeated when clocks fall back) is taken as
//!    standard time,
//!  * a civil time that never occurs (the hour skipped when clocks spring forward) is an
//!    [`InvalidTimestamp`][VolumeError::InvalidTimestamp].
use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::{OffsetComponents, Tz};

use crate::{BinWidth, VolumeError};

/// Format of interval ids and other civil timestamps written out, e.g. `2024-10-21 08:00:00-0500`.
pub const CIVIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Formats accepted for timestamps carrying an explicit offset, beyond RFC 3339.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

/// Formats accepted for civil timestamps without an offset.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date and time of day of an instant in the target zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilKey {
    pub date: NaiveDate,
    pub time_of_day: NaiveTime,
}

/// Converts instants to and from civil time in one fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    zone: Tz,
}

impl TimeNormalizer {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Create from an IANA zone name, e.g. "US/Central" or "America/Chicago".
    pub fn from_name(name: &str) -> Result<Self, VolumeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| VolumeError::InvalidTimeZone(name.to_string()))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Civil time of an instant in the target zone.
    pub fn to_target(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.zone)
    }

    /// Date and time-of-day key of an instant in the target zone.
    pub fn civil_key(&self, instant: DateTime<Utc>) -> CivilKey {
        let civil = self.to_target(instant).naive_local();
        CivilKey {
            date: civil.date(),
            time_of_day: civil.time(),
        }
    }

    /// Interpret a civil time without an offset as a time in the target zone.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Tz>, VolumeError> {
        match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(v) => Ok(v),
            LocalResult::Ambiguous(first, second) => {
                if first.offset().dst_offset() <= second.offset().dst_offset() {
                    Ok(first)
                } else {
                    Ok(second)
                }
            }
            LocalResult::None => Err(VolumeError::InvalidTimestamp(format!(
                "{naive} does not exist in {}",
                self.zone
            ))),
        }
    }

    /// Parse a bound of a run, e.g. "2024-10-21 00:00:00-05:00" or "2024-10-21 00:00:00".
    ///
    /// A bound without an offset is a civil time in the target zone; a bare date is midnight.
    pub fn parse_bound(&self, text: &str) -> Result<DateTime<Utc>, VolumeError> {
        if let Ok(v) = parse_instant(text) {
            return Ok(v);
        }
        let text = text.trim();
        let naive = parse_naive(text)
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
            .ok_or_else(|| VolumeError::InvalidTimestamp(text.to_string()))?;
        Ok(self.localize(naive)?.with_timezone(&Utc))
    }

    /// Start of the bin that an instant falls in.
    ///
    /// Bins are aligned on wall-clock time in the target zone, counted from midnight. The offset
    /// in effect at the instant is used both ways, so the two occurrences of a repeated hour
    /// stay in separate bins. `width` divides an hour and offsets change on the hour, so a bin
    /// never spans a change of offset.
    pub fn bin_start(&self, instant: DateTime<Utc>, width: BinWidth) -> DateTime<Utc> {
        let offset = i64::from(self.to_target(instant).offset().fix().local_minus_utc());
        let wall_seconds = instant.timestamp() + offset;
        let into_bin = wall_seconds.rem_euclid(width.seconds());
        instant
            - TimeDelta::seconds(into_bin)
            - TimeDelta::nanoseconds(i64::from(instant.timestamp_subsec_nanos()))
    }
}

/// Parse a source timestamp into an instant.
///
/// Accepts RFC 3339 (with `T` or a space between date and time), `+hh`, `+hhmm` and `+hh:mm`
/// offsets, optional fractional seconds, and a trailing `Z` or ` UTC`.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, VolumeError> {
    let text = text.trim();

    if let Ok(v) = DateTime::parse_from_rfc3339(text) {
        return Ok(v.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(v) = DateTime::parse_from_str(text, format) {
            return Ok(v.with_timezone(&Utc));
        }
    }
    if let Some(naive) = text
        .strip_suffix(" UTC")
        .or_else(|| text.strip_suffix('Z'))
        .and_then(|v| parse_naive(v.trim_end()))
    {
        return Ok(naive.and_utc());
    }

    Err(VolumeError::InvalidTimestamp(text.to_string()))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}
