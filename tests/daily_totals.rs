use std::path::Path;

use chrono::NaiveDate;

use traffic_volume_xml::{
    daily::{daily_totals, time_of_day_profile},
    extract_from_file::Extract,
    locations::LocationCodes,
    time_normalize::TimeNormalizer,
    VolumeRecord,
};

#[test]
fn daily_totals_from_sample_file() {
    let records = VolumeRecord::extract(Path::new("test_files/volume/sample.csv")).unwrap();
    let locations = LocationCodes::from_path(Path::new("test_files/locations.csv")).unwrap();
    let normalizer = TimeNormalizer::from_name("US/Central").unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();

    let totals = daily_totals(&records, &normalizer, &locations, day, day).unwrap();

    let summary = totals
        .iter()
        .map(|t| (t.name.as_str(), t.vehicle_count))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("Madison Square Boulevard and Murfreesboro Road", 21),
            ("Stones River Road and Murfreesboro Road", 10),
        ]
    );
}

#[test]
fn profile_from_sample_file() {
    let records = VolumeRecord::extract(Path::new("test_files/volume/sample.csv")).unwrap();
    let normalizer = TimeNormalizer::from_name("US/Central").unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();

    let profile = time_of_day_profile(
        &records,
        &normalizer,
        "3c0d5e0a-5b7c-4a56-9d3a-0c1f1e6b1a01",
        &[day],
    );

    let counts = profile
        .iter()
        .map(|v| (v.time_of_day.to_string(), v.vehicle_count))
        .collect::<Vec<_>>();
    assert_eq!(
        counts,
        vec![
            ("08:00:00".to_string(), 4),
            ("08:05:00".to_string(), 5),
            ("08:10:00".to_string(), 2),
            ("08:15:00".to_string(), 4),
            ("08:20:00".to_string(), 6),
        ]
    );
}
