//! Serialize aggregated bins into the interval/edge-relation document used by SUMO.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <data>
//!     <interval id="2024-10-21 08:00:00-0500" begin="0" end="900">
//!         <edgeRelation from="S1-N-in" to="S1-S-out" count="8"/>
//!     </interval>
//! </data>
//! ```
//!
//! There is one interval per distinct bin start, across all locations. `begin` and `end` are
//! seconds from the earliest bin start in the whole set.
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::{
    locations::LocationCodes, time_normalize::CIVIL_FORMAT, write_atomically, AggregatedBin,
    BinWidth, VolumeError,
};

/// Vehicles moving from one approach of a location to another during an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRelation {
    pub from: String,
    pub to: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    /// Civil start of the interval, with UTC offset.
    pub id: String,
    pub begin: i64,
    pub end: i64,
    pub edge_relations: Vec<EdgeRelation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntervalDocument {
    pub intervals: Vec<Interval>,
}

impl IntervalDocument {
    /// Arrange bins into intervals, naming each movement by its location's code.
    ///
    /// Fails as a whole if any bin's location has no code.
    pub fn build(
        bins: &[AggregatedBin],
        locations: &LocationCodes,
        width: BinWidth,
    ) -> Result<Self, VolumeError> {
        let origin = bins
            .iter()
            .map(|bin| bin.bin_start.with_timezone(&Utc))
            .min()
            .ok_or(VolumeError::EmptyInput)?;

        let mut by_start: BTreeMap<DateTime<Utc>, Vec<&AggregatedBin>> = BTreeMap::new();
        for bin in bins {
            by_start
                .entry(bin.bin_start.with_timezone(&Utc))
                .or_default()
                .push(bin);
        }

        let mut intervals = Vec::with_capacity(by_start.len());
        for (start, bins) in by_start {
            // Every group has at least the bin that created it.
            let id = bins[0].bin_start.format(CIVIL_FORMAT).to_string();
            let begin = (start - origin).num_seconds();

            let mut edge_relations = Vec::with_capacity(bins.len());
            for bin in bins {
                let code = match locations.resolve(&bin.location_id) {
                    Ok(v) => v,
                    Err(_) => {
                        return Err(VolumeError::UnresolvedLocation {
                            location_id: bin.location_id.clone(),
                            interval: id,
                        })
                    }
                };
                edge_relations.push(EdgeRelation {
                    from: format!("{code}-{}-in", bin.entrance_direction),
                    to: format!("{code}-{}-out", bin.exit_direction),
                    count: bin.vehicle_count,
                });
            }
            edge_relations.sort_unstable_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

            intervals.push(Interval {
                id,
                begin,
                end: begin + width.seconds(),
                edge_relations,
            });
        }

        debug!("Arranged {} bins into {} intervals.", bins.len(), intervals.len());
        Ok(Self { intervals })
    }

    /// Sum of counts over all edge relations.
    pub fn total_count(&self) -> u64 {
        self.intervals
            .iter()
            .flat_map(|i| i.edge_relations.iter())
            .map(|e| e.count)
            .sum()
    }

    /// Render the document as XML.
    pub fn to_xml(&self) -> Result<Vec<u8>, VolumeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("data")))?;

        for interval in &self.intervals {
            let begin = interval.begin.to_string();
            let end = interval.end.to_string();
            let mut element = BytesStart::new("interval");
            element.push_attribute(("id", interval.id.as_str()));
            element.push_attribute(("begin", begin.as_str()));
            element.push_attribute(("end", end.as_str()));
            writer.write_event(Event::Start(element))?;

            for relation in &interval.edge_relations {
                let count = relation.count.to_string();
                let mut element = BytesStart::new("edgeRelation");
                element.push_attribute(("from", relation.from.as_str()));
                element.push_attribute(("to", relation.to.as_str()));
                element.push_attribute(("count", count.as_str()));
                writer.write_event(Event::Empty(element))?;
            }

            writer.write_event(Event::End(BytesEnd::new("interval")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("data")))?;
        let mut xml = writer.into_inner();
        xml.push(b'\n');
        Ok(xml)
    }

    /// Write the rendered document to any sink.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<(), VolumeError> {
        sink.write_all(&self.to_xml()?)?;
        sink.flush()?;
        Ok(())
    }

    /// Write the document to `path`.
    ///
    /// The document is rendered in memory and [written atomically][write_atomically], so
    /// `path` never holds an incomplete document.
    pub fn write_file(&self, path: &Path) -> Result<(), VolumeError> {
        write_atomically(path, &self.to_xml()?)?;
        info!(
            "Wrote {} intervals ({} vehicles) to {path:?}.",
            self.intervals.len(),
            self.total_count()
        );
        Ok(())
    }
}
