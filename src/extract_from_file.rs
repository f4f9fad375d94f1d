//! Extract volume records from files, and write aggregated bins back out.
use std::fs::File;
use std::io;
use std::path::Path;

use csv::{Reader, ReaderBuilder, Trim, Writer};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    time_normalize::{parse_instant, CIVIL_FORMAT},
    write_atomically, AggregatedBin, RecordProblem, VolumeError, VolumeRecord,
};

/// A trait for extracting count data from a file.
pub trait Extract {
    type Item;
    fn extract(path: &Path) -> Result<Vec<Self::Item>, VolumeError>;
}

/// Extract VolumeRecords from a CSV file.
impl Extract for VolumeRecord {
    type Item = VolumeRecord;

    fn extract(path: &Path) -> Result<Vec<Self::Item>, VolumeError> {
        let data_file = File::open(path)?;
        let records = extract_records(create_reader(data_file))?;
        info!("Extracted {} records from {path:?}.", records.len());
        Ok(records)
    }
}

/// A row of volume data, as exported from the volume table.
///
/// Every field is optional here so that an empty or missing one can be reported by name.
#[derive(Debug, Deserialize)]
struct VolumeRow {
    #[serde(alias = "intersection_id")]
    location_id: Option<String>,
    data_update_time: Option<String>,
    data_interval_in_minutes: Option<String>,
    vehicle_class: Option<String>,
    entrance_direction: Option<String>,
    exit_direction: Option<String>,
    vehicle_count: Option<String>,
}

/// Create CSV reader with headers, trimming whitespace.
pub fn create_reader<R: io::Read>(rdr: R) -> Reader<R> {
    ReaderBuilder::new().trim(Trim::All).from_reader(rdr)
}

/// Extract every record from a CSV reader, failing on the first malformed one.
pub fn extract_records<R: io::Read>(mut rdr: Reader<R>) -> Result<Vec<VolumeRecord>, VolumeError> {
    let mut records = vec![];
    for (i, row) in rdr.deserialize::<VolumeRow>().enumerate() {
        // The header is line 1.
        let line = i as u64 + 2;
        let row = row?;
        let malformed = |problem| VolumeError::MalformedRecord { line, problem };

        let location_id = required(row.location_id, "location_id").map_err(malformed)?;
        let timestamp = required(row.data_update_time, "data_update_time").map_err(malformed)?;
        let interval = required(row.data_interval_in_minutes, "data_interval_in_minutes")
            .map_err(malformed)?;
        let vehicle_class = required(row.vehicle_class, "vehicle_class").map_err(malformed)?;
        let entrance = required(row.entrance_direction, "entrance_direction").map_err(malformed)?;
        let exit = required(row.exit_direction, "exit_direction").map_err(malformed)?;
        let count = required(row.vehicle_count, "vehicle_count").map_err(malformed)?;

        let timestamp = parse_instant(&timestamp)
            .map_err(|_| VolumeError::InvalidTimestamp(format!("`{timestamp}` on line {line}")))?;
        let interval = interval
            .parse::<i64>()
            .map_err(|_| malformed(RecordProblem::InvalidIntervalLength(interval.clone())))?;
        let count = count
            .parse::<i64>()
            .map_err(|_| malformed(RecordProblem::InvalidCount(count.clone())))?;

        let record = VolumeRecord::new(
            location_id,
            timestamp,
            interval,
            vehicle_class,
            entrance,
            exit,
            count,
        )
        .map_err(malformed)?;
        records.push(record);
    }
    Ok(records)
}

fn required(field: Option<String>, name: &'static str) -> Result<String, RecordProblem> {
    match field {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RecordProblem::MissingField(name)),
    }
}

/// A row of aggregated output.
#[derive(Debug, Serialize)]
struct AggregatedRow<'a> {
    location_id: &'a str,
    entrance_direction: &'a str,
    exit_direction: &'a str,
    bin_start: String,
    vehicle_count: u64,
}

/// Write aggregated bins as CSV.
pub fn write_aggregated_csv<W: io::Write>(
    bins: &[AggregatedBin],
    wtr: W,
) -> Result<(), VolumeError> {
    let mut wtr = Writer::from_writer(wtr);
    for bin in bins {
        wtr.serialize(AggregatedRow {
            location_id: &bin.location_id,
            entrance_direction: &bin.entrance_direction,
            exit_direction: &bin.exit_direction,
            bin_start: bin.bin_start.format(CIVIL_FORMAT).to_string(),
            vehicle_count: bin.vehicle_count,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write bins as CSV to `path`, [atomically][write_atomically].
pub fn write_aggregated_csv_file(bins: &[AggregatedBin], path: &Path) -> Result<(), VolumeError> {
    let mut csv = vec![];
    write_aggregated_csv(bins, &mut csv)?;
    write_atomically(path, &csv)?;
    info!("Wrote {} aggregated bins to {path:?}.", bins.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "intersection_id,data_update_time,data_interval_in_minutes,vehicle_class,entrance_direction,exit_direction,vehicle_count\n";

    fn extract_str(rows: &str) -> Result<Vec<VolumeRecord>, VolumeError> {
        let data = format!("{HEADER}{rows}");
        extract_records(create_reader(data.as_bytes()))
    }

    #[test]
    fn extracts_rows() {
        let records = extract_str(
            "abc, 2024-10-21 13:00:00+00:00 ,5,Light,N,S,3
abc,2024-10-21 13:05:00+00:00,5,Bicycle,S,N,0
",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location_id, "abc");
        assert_eq!(records[0].vehicle_count, 3);
        assert_eq!(records[1].vehicle_class, "Bicycle");
        assert_eq!(records[1].entrance_direction, "S");
    }

    #[test]
    fn location_id_header_also_accepted() {
        let data = "location_id,data_update_time,data_interval_in_minutes,vehicle_class,entrance_direction,exit_direction,vehicle_count
abc,2024-10-21T13:00:00Z,15,Light,N,S,3
";
        let records = extract_records(create_reader(data.as_bytes())).unwrap();
        assert_eq!(records[0].interval_length_minutes, 15);
    }

    #[test]
    fn negative_count_errs_with_line() {
        assert!(matches!(
            extract_str(
                "abc,2024-10-21 13:00:00+00:00,5,Light,N,S,3
abc,2024-10-21 13:05:00+00:00,5,Light,N,S,-2
"
            ),
            Err(VolumeError::MalformedRecord {
                line: 3,
                problem: RecordProblem::NegativeCount(-2)
            })
        ));
    }

    #[test]
    fn missing_field_errs() {
        assert!(matches!(
            extract_str("abc,2024-10-21 13:00:00+00:00,5,Light,,S,3\n"),
            Err(VolumeError::MalformedRecord {
                line: 2,
                problem: RecordProblem::MissingField("entrance_direction")
            })
        ));
    }

    #[test]
    fn non_numeric_count_errs() {
        assert!(matches!(
            extract_str("abc,2024-10-21 13:00:00+00:00,5,Light,N,S,many\n"),
            Err(VolumeError::MalformedRecord {
                problem: RecordProblem::InvalidCount(_),
                ..
            })
        ));
    }

    #[test]
    fn bad_timestamp_errs() {
        assert!(matches!(
            extract_str("abc,21/10/2024 1pm,5,Light,N,S,3\n"),
            Err(VolumeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn writes_aggregated_csv() {
        use chrono::DateTime;
        use chrono_tz::US::Central;

        let bins = vec![AggregatedBin {
            location_id: "abc".to_string(),
            entrance_direction: "N".to_string(),
            exit_direction: "S".to_string(),
            bin_start: DateTime::parse_from_rfc3339("2024-10-21T13:00:00Z")
                .unwrap()
                .with_timezone(&Central),
            vehicle_count: 8,
        }];
        let mut out = vec![];
        write_aggregated_csv(&bins, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "location_id,entrance_direction,exit_direction,bin_start,vehicle_count\n\
             abc,N,S,2024-10-21 08:00:00-0500,8\n"
        );
    }
}
