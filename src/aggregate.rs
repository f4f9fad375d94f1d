//! Bin volume records into fixed-width intervals per movement.
//!
//! Records are grouped by [`MovementKey`] and by the start of the bin their timestamp falls
//! in. Bins are half-open, `[start, start + width)`, so a record exactly on a boundary starts a
//! new bin. Only bins with at least one record are produced; a missing bin means a count of
//! zero, not missing data.
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::{
    time_normalize::TimeNormalizer, AggregatedBin, BinWidth, VolumeError, VolumeRecord,
};

/// A movement through a location: where vehicles entered and where they exited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovementKey {
    pub location_id: String,
    pub entrance_direction: String,
    pub exit_direction: String,
}

impl MovementKey {
    pub fn of(record: &VolumeRecord) -> Self {
        Self {
            location_id: record.location_id.clone(),
            entrance_direction: record.entrance_direction.clone(),
            exit_direction: record.exit_direction.clone(),
        }
    }
}

/// Identifies the movement and bin for summing counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct BinnedMovementKey {
    movement: MovementKey,
    bin_start: DateTime<Utc>,
}

/// Sum record counts into bins of `width`, aligned in the normalizer's zone.
///
/// The result is ordered by location, entrance, exit and then bin start, whatever the order
/// of `records`.
pub fn aggregate(
    records: &[VolumeRecord],
    normalizer: &TimeNormalizer,
    width: BinWidth,
) -> Result<Vec<AggregatedBin>, VolumeError> {
    if records.is_empty() {
        return Err(VolumeError::EmptyInput);
    }

    let mut binned: HashMap<BinnedMovementKey, u64> = HashMap::new();
    for record in records {
        let key = BinnedMovementKey {
            movement: MovementKey::of(record),
            bin_start: normalizer.bin_start(record.timestamp, width),
        };
        binned
            .entry(key)
            .and_modify(|c| *c += u64::from(record.vehicle_count))
            .or_insert(u64::from(record.vehicle_count));
    }

    // Convert HashMap to Vec of bins.
    let mut keyed = binned.into_iter().collect::<Vec<_>>();
    keyed.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let bins = keyed
        .into_iter()
        .map(|(key, vehicle_count)| AggregatedBin {
            location_id: key.movement.location_id,
            entrance_direction: key.movement.entrance_direction,
            exit_direction: key.movement.exit_direction,
            bin_start: normalizer.to_target(key.bin_start),
            vehicle_count,
        })
        .collect::<Vec<_>>();

    info!(
        "Aggregated {} records into {} {}-minute bins.",
        records.len(),
        bins.len(),
        width.minutes()
    );
    Ok(bins)
}

/// Keep records with `start <= timestamp <= end`.
pub fn filter_time_range(
    records: Vec<VolumeRecord>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<VolumeRecord> {
    let total = records.len();
    let kept = records
        .into_iter()
        .filter(|r| start.map_or(true, |start| r.timestamp >= start))
        .filter(|r| end.map_or(true, |end| r.timestamp <= end))
        .collect::<Vec<_>>();
    info!("{} of {total} records are within the time range.", kept.len());
    kept
}

/// Keep records of the given locations.
pub fn retain_locations<'a, I>(records: Vec<VolumeRecord>, location_ids: I) -> Vec<VolumeRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let location_ids = location_ids.into_iter().collect::<HashSet<_>>();
    let total = records.len();
    let kept = records
        .into_iter()
        .filter(|r| location_ids.contains(r.location_id.as_str()))
        .collect::<Vec<_>>();
    if kept.len() != total {
        warn!(
            "Excluded {} records of locations not in the location table.",
            total - kept.len()
        );
    }
    kept
}

/// Remove repeated records, keeping the first of each.
///
/// A repeat has the same location, timestamp, vehicle class and movement as an earlier record.
pub fn dedup_records(records: Vec<VolumeRecord>) -> Vec<VolumeRecord> {
    let total = records.len();
    let mut seen = HashSet::new();
    let kept = records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.location_id.clone(),
                r.timestamp,
                r.vehicle_class.clone(),
                r.entrance_direction.clone(),
                r.exit_direction.clone(),
            ))
        })
        .collect::<Vec<_>>();
    if kept.len() == total {
        debug!("No duplicate records found.");
    } else {
        warn!("Removed {} duplicate records.", total - kept.len());
    }
    kept
}
