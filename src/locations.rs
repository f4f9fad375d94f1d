//! Short codes and names of count locations.
//!
//! Location ids in volume data are opaque (usually UUIDs). Movements in the interval document
//! are named after a short code instead, e.g. `S1-N-in`. The table is read once, from a CSV
//! with `id,code,name` headers, and then only read from.
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Deserialize;

use crate::{RecordProblem, VolumeError};

/// One row of the location table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
}

impl Location {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Mapping of location ids to their codes and names.
#[derive(Debug, Clone, Default)]
pub struct LocationCodes {
    by_id: HashMap<String, Location>,
}

impl LocationCodes {
    /// Build from entries; the position of an entry (from 1) is reported as its line on error.
    pub fn from_entries<I>(entries: I) -> Result<Self, VolumeError>
    where
        I: IntoIterator<Item = Location>,
    {
        let mut codes = Self::default();
        for (i, location) in entries.into_iter().enumerate() {
            codes.insert(i as u64 + 1, location)?;
        }
        Ok(codes)
    }

    /// Read the table from CSV.
    pub fn from_reader<R: io::Read>(rdr: R) -> Result<Self, VolumeError> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(rdr);
        let mut codes = Self::default();
        for (i, row) in rdr.deserialize::<Location>().enumerate() {
            // The header is line 1.
            codes.insert(i as u64 + 2, row?)?;
        }
        debug!("Loaded {} locations.", codes.len());
        Ok(codes)
    }

    pub fn from_path(path: &Path) -> Result<Self, VolumeError> {
        Self::from_reader(File::open(path)?)
    }

    fn insert(&mut self, line: u64, location: Location) -> Result<(), VolumeError> {
        if self.by_id.contains_key(&location.id) {
            return Err(VolumeError::MalformedRecord {
                line,
                problem: RecordProblem::DuplicateLocationId(location.id),
            });
        }
        if self.id_for_code(&location.code).is_some() {
            return Err(VolumeError::MalformedRecord {
                line,
                problem: RecordProblem::DuplicateLocationCode(location.code),
            });
        }
        self.by_id.insert(location.id.clone(), location);
        Ok(())
    }

    /// The short code of a location.
    pub fn resolve(&self, location_id: &str) -> Result<&str, VolumeError> {
        self.by_id
            .get(location_id)
            .map(|v| v.code.as_str())
            .ok_or_else(|| VolumeError::UnknownLocation(location_id.to_string()))
    }

    /// The full name of a location.
    pub fn name(&self, location_id: &str) -> Result<&str, VolumeError> {
        self.by_id
            .get(location_id)
            .map(|v| v.name.as_str())
            .ok_or_else(|| VolumeError::UnknownLocation(location_id.to_string()))
    }

    pub fn id_for_code(&self, code: &str) -> Option<&str> {
        self.by_id
            .values()
            .find(|v| v.code == code)
            .map(|v| v.id.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "id,code,name
aaa-111, S1 ,Madison Square Boulevard and Murfreesboro Road
bbb-222,S2,Stones River Road and Murfreesboro Road
";

    #[test]
    fn resolve_and_name_from_csv() {
        let codes = LocationCodes::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes.resolve("aaa-111").unwrap(), "S1");
        assert_eq!(
            codes.name("bbb-222").unwrap(),
            "Stones River Road and Murfreesboro Road"
        );
        assert_eq!(codes.id_for_code("S2"), Some("bbb-222"));
        assert_eq!(codes.id_for_code("S3"), None);
    }

    #[test]
    fn unknown_location_errs() {
        let codes = LocationCodes::from_reader(TABLE.as_bytes()).unwrap();
        assert!(matches!(
            codes.resolve("zzz"),
            Err(VolumeError::UnknownLocation(id)) if id == "zzz"
        ));
        assert!(matches!(
            codes.name("zzz"),
            Err(VolumeError::UnknownLocation(_))
        ));
    }

    #[test]
    fn duplicate_id_errs_with_line() {
        let table = format!("{TABLE}aaa-111,S3,Floyd Mayfield Drive and Murfreesboro Pike\n");
        assert!(matches!(
            LocationCodes::from_reader(table.as_bytes()),
            Err(VolumeError::MalformedRecord {
                line: 4,
                problem: RecordProblem::DuplicateLocationId(_)
            })
        ));
    }

    #[test]
    fn duplicate_code_errs() {
        assert!(matches!(
            LocationCodes::from_entries([
                Location::new("a", "S1", "First"),
                Location::new("b", "S1", "Second"),
            ]),
            Err(VolumeError::MalformedRecord {
                line: 2,
                problem: RecordProblem::DuplicateLocationCode(_)
            })
        ));
    }

    #[test]
    fn mappings_are_independent() {
        let first = LocationCodes::from_entries([Location::new("X", "S1", "One")]).unwrap();
        let second = LocationCodes::from_entries([Location::new("X", "S9", "Nine")]).unwrap();
        assert_eq!(first.resolve("X").unwrap(), "S1");
        assert_eq!(second.resolve("X").unwrap(), "S9");
    }
}
