//! Run SUMO's route sampler over a written interval document, and point SUMO configurations at
//! the trips it writes.
//!
//! The sampler is an external script; it is handed the route definitions and the document and
//! writes trips next to the document. Only its exit status is checked.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::{write_atomically, VolumeError};

const ROUTE_FILES: &[u8] = b"route-files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSampler {
    /// Interpreter to run the script with.
    pub python: String,
    pub script: PathBuf,
}

impl RouteSampler {
    pub fn new(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }

    /// The command that samples routes from `route_file` to match the counts in `turn_file`.
    pub fn command(&self, route_file: &Path, turn_file: &Path, trips: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script)
            .arg("-r")
            .arg(route_file)
            .arg("--turn-files")
            .arg(turn_file)
            .arg("-o")
            .arg(trips);
        cmd
    }

    /// Run the sampler and return the path of the trips it wrote.
    pub fn run(&self, route_file: &Path, turn_file: &Path) -> Result<PathBuf, VolumeError> {
        let trips = trips_path(turn_file);
        info!("Sampling routes from {route_file:?} with counts in {turn_file:?}.");

        let status = self.command(route_file, turn_file, &trips).status()?;
        if !status.success() {
            return Err(VolumeError::RouteSampler(format!(
                "{:?} exited with {status}",
                self.script
            )));
        }

        info!("Wrote vehicle trips to {trips:?}.");
        Ok(trips)
    }
}

/// Where trips for a turn-count document are written, e.g. `volume.xml` -> `volume_trips.xml`.
pub fn trips_path(turn_file: &Path) -> PathBuf {
    let stem = turn_file
        .file_stem()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    turn_file.with_file_name(format!("{stem}_trips.xml"))
}

/// Set the `value` of every `route-files` element in a SUMO configuration file to `trips_file`.
///
/// Everything else in the file is passed through unchanged. Returns whether an element was
/// found; a file without one is left alone.
pub fn update_route_files(config_file: &Path, trips_file: &str) -> Result<bool, VolumeError> {
    let text = fs::read_to_string(config_file)?;
    let mut reader = Reader::from_str(&text);
    let mut writer = Writer::new(Vec::with_capacity(text.len()));
    let mut found = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(e) if e.name().as_ref() == ROUTE_FILES => {
                writer.write_event(Event::Empty(with_value(&e, trips_file)?))?;
                found = true;
            }
            Event::Start(e) if e.name().as_ref() == ROUTE_FILES => {
                writer.write_event(Event::Start(with_value(&e, trips_file)?))?;
                found = true;
            }
            event => writer.write_event(event)?,
        }
    }

    if !found {
        warn!("No route-files element in {config_file:?}; left unchanged.");
        return Ok(false);
    }
    write_atomically(config_file, &writer.into_inner())?;
    info!("Pointed {config_file:?} at {trips_file}.");
    Ok(true)
}

/// Copy of an element with its `value` attribute set, keeping other attributes in order.
fn with_value(element: &BytesStart, value: &str) -> Result<BytesStart<'static>, VolumeError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"value" {
            updated.push_attribute(("value", value));
            replaced = true;
        } else {
            updated.push_attribute(attr);
        }
    }
    if !replaced {
        updated.push_attribute(("value", value));
    }
    Ok(updated)
}
