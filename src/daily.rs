//! Daily totals and time-of-day volume profiles.
//!
//! Both work on civil dates in the normalizer's zone, so a day runs from local midnight to
//! local midnight.
use std::collections::{HashMap, HashSet};
use std::io;

use chrono::{NaiveDate, NaiveTime};
use log::info;
use serde::Serialize;

use crate::{
    locations::LocationCodes, time_normalize::TimeNormalizer, VolumeError, VolumeRecord,
};

/// Total vehicles counted at a location on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub location_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub vehicle_count: u64,
}

/// Total vehicles counted at a location, over all movements, at one time of one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOfDayVolume {
    pub date: NaiveDate,
    pub time_of_day: NaiveTime,
    pub vehicle_count: u64,
}

/// Sum counts per location and date, for dates from `first_date` through `last_date`.
///
/// Ordered by location name and then date. Every record's location must be in `locations`,
/// including records outside the date range.
pub fn daily_totals(
    records: &[VolumeRecord],
    normalizer: &TimeNormalizer,
    locations: &LocationCodes,
    first_date: NaiveDate,
    last_date: NaiveDate,
) -> Result<Vec<DailyTotal>, VolumeError> {
    let mut totals: HashMap<(&str, NaiveDate), u64> = HashMap::new();
    for record in records {
        locations.resolve(&record.location_id)?;
        let date = normalizer.civil_key(record.timestamp).date;
        if date < first_date || date > last_date {
            continue;
        }
        *totals
            .entry((record.location_id.as_str(), date))
            .or_insert(0) += u64::from(record.vehicle_count);
    }

    // Convert HashMap to Vec of structs.
    let mut daily = Vec::with_capacity(totals.len());
    for ((location_id, date), vehicle_count) in totals {
        daily.push(DailyTotal {
            location_id: location_id.to_string(),
            name: locations.name(location_id)?.to_string(),
            date,
            vehicle_count,
        });
    }
    daily.sort_unstable_by(|a, b| (&a.name, a.date).cmp(&(&b.name, b.date)));

    info!(
        "Summed {} daily totals from {first_date} through {last_date}.",
        daily.len()
    );
    Ok(daily)
}

/// Sum counts of one location per time of day, for each of `dates`.
///
/// Ordered by date and then time of day.
pub fn time_of_day_profile(
    records: &[VolumeRecord],
    normalizer: &TimeNormalizer,
    location_id: &str,
    dates: &[NaiveDate],
) -> Vec<TimeOfDayVolume> {
    let dates = dates.iter().collect::<HashSet<_>>();
    let mut volumes: HashMap<(NaiveDate, NaiveTime), u64> = HashMap::new();
    for record in records.iter().filter(|r| r.location_id == location_id) {
        let key = normalizer.civil_key(record.timestamp);
        if dates.contains(&key.date) {
            *volumes.entry((key.date, key.time_of_day)).or_insert(0) +=
                u64::from(record.vehicle_count);
        }
    }

    let mut profile = volumes
        .into_iter()
        .map(|((date, time_of_day), vehicle_count)| TimeOfDayVolume {
            date,
            time_of_day,
            vehicle_count,
        })
        .collect::<Vec<_>>();
    profile.sort_unstable_by_key(|v| (v.date, v.time_of_day));
    profile
}

/// Write a time-of-day profile as CSV.
pub fn write_time_of_day_csv<W: io::Write>(
    profile: &[TimeOfDayVolume],
    wtr: W,
) -> Result<(), VolumeError> {
    let mut wtr = csv::Writer::from_writer(wtr);
    for volume in profile {
        wtr.serialize(volume)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write daily totals as CSV.
pub fn write_daily_totals_csv<W: io::Write>(
    totals: &[DailyTotal],
    wtr: W,
) -> Result<(), VolumeError> {
    let mut wtr = csv::Writer::from_writer(wtr);
    for total in totals {
        wtr.serialize(total)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::locations::Location;

    fn record(location: &str, rfc3339: &str, count: i64) -> VolumeRecord {
        let timestamp = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        VolumeRecord::new(location, timestamp, 15, "Light", "N", "S", count).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (TimeNormalizer, LocationCodes) {
        (
            TimeNormalizer::from_name("US/Central").unwrap(),
            LocationCodes::from_entries([
                Location::new("a", "S1", "Madison Square"),
                Location::new("b", "S2", "Floyd Mayfield"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn totals_use_local_dates() {
        let (normalizer, locations) = setup();
        let records = vec![
            // 2024-06-19 23:30 CDT
            record("a", "2024-06-20T04:30:00Z", 5),
            // 2024-06-20 00:00 CDT
            record("a", "2024-06-20T05:00:00Z", 7),
            record("b", "2024-06-20T15:00:00Z", 1),
        ];
        let totals = daily_totals(
            &records,
            &normalizer,
            &locations,
            date(2024, 6, 19),
            date(2024, 6, 20),
        )
        .unwrap();
        let summary = totals
            .iter()
            .map(|t| (t.name.as_str(), t.date, t.vehicle_count))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("Floyd Mayfield", date(2024, 6, 20), 1),
                ("Madison Square", date(2024, 6, 19), 5),
                ("Madison Square", date(2024, 6, 20), 7),
            ]
        );
    }

    #[test]
    fn totals_exclude_dates_outside_range() {
        let (normalizer, locations) = setup();
        let records = vec![record("a", "2024-06-20T15:00:00Z", 5)];
        let totals = daily_totals(
            &records,
            &normalizer,
            &locations,
            date(2024, 6, 21),
            date(2024, 6, 30),
        )
        .unwrap();
        assert!(totals.is_empty());
    }

    #[test]
    fn totals_with_unknown_location_err() {
        let (normalizer, locations) = setup();
        let records = vec![record("zzz", "2024-06-20T15:00:00Z", 5)];
        assert!(matches!(
            daily_totals(
                &records,
                &normalizer,
                &locations,
                date(2024, 6, 1),
                date(2024, 6, 30)
            ),
            Err(VolumeError::UnknownLocation(_))
        ));
    }

    #[test]
    fn profile_sums_movements_per_time() {
        let (normalizer, _) = setup();
        let records = vec![
            record("a", "2024-09-18T13:00:00Z", 2),
            record("a", "2024-09-18T13:00:00Z", 3),
            record("a", "2024-09-18T13:15:00Z", 4),
            record("b", "2024-09-18T13:00:00Z", 100),
            record("a", "2024-06-19T13:00:00Z", 9),
            record("a", "2024-12-25T13:00:00Z", 1),
        ];
        let profile = time_of_day_profile(
            &records,
            &normalizer,
            "a",
            &[date(2024, 9, 18), date(2024, 12, 25)],
        );
        let summary = profile
            .iter()
            .map(|v| (v.date, v.time_of_day.to_string(), v.vehicle_count))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (date(2024, 9, 18), "08:00:00".to_string(), 5),
                (date(2024, 9, 18), "08:15:00".to_string(), 4),
                (date(2024, 12, 25), "07:00:00".to_string(), 1),
            ]
        );
    }

    #[test]
    fn daily_csv() {
        let totals = vec![DailyTotal {
            location_id: "a".to_string(),
            name: "Madison Square".to_string(),
            date: date(2024, 6, 19),
            vehicle_count: 12,
        }];
        let mut out = vec![];
        write_daily_totals_csv(&totals, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "location_id,name,date,vehicle_count\na,Madison Square,2024-06-19,12\n"
        );
    }

    #[test]
    fn profile_csv() {
        let profile = vec![TimeOfDayVolume {
            date: date(2024, 9, 18),
            time_of_day: NaiveTime::from_hms_opt(8, 15, 0).unwrap(),
            vehicle_count: 4,
        }];
        let mut out = vec![];
        write_time_of_day_csv(&profile, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,time_of_day,vehicle_count\n2024-09-18,08:15:00,4\n"
        );
    }
}
