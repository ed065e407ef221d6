use crate::extract::Extractor;
use crate::record::{Payload, Record};
use crate::sink::{Column, RowFormat, RowSink, TableSpec};
use crate::Error;
use std::path::PathBuf;

/// Range-scanner topics: one fixed-width text line per sweep, scalars first,
/// then the full ranges and intensities arrays joined inline.
pub struct LaserExtractor {
    spec: TableSpec,
    begun: bool,
}

impl LaserExtractor {
    pub fn new(topic: &str, path: PathBuf) -> Self {
        let columns = vec![
            Column::integer("seq"),
            Column::integer("secs"),
            Column::integer("nsecs"),
            Column::real("angle_min"),
            Column::real("angle_max"),
            Column::real("angle_increment"),
            Column::real("time_increment"),
            Column::real("scan_time"),
            Column::real("range_min"),
            Column::real("range_max"),
            Column::text("ranges"),
            Column::text("intensities"),
        ];
        LaserExtractor {
            spec: TableSpec {
                name: topic.to_string(),
                path,
                format: RowFormat::Plain,
                columns,
            },
            begun: false,
        }
    }
}

fn join_inline(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Extractor for LaserExtractor {
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error> {
        let Payload::Laser(scan) = &record.payload else {
            return Err(Error::Decode(format!(
                "unexpected payload on laser topic {}",
                self.spec.name
            )));
        };
        if !self.begun {
            sink.begin_table(&self.spec)?;
            self.begun = true;
        }
        let row = vec![
            record.seq.to_string(),
            record.stamp.sec.to_string(),
            record.stamp.nsec.to_string(),
            scan.angle_min.to_string(),
            scan.angle_max.to_string(),
            scan.angle_increment.to_string(),
            scan.time_increment.to_string(),
            scan.scan_time.to_string(),
            scan.range_min.to_string(),
            scan.range_max.to_string(),
            join_inline(&scan.ranges),
            join_inline(&scan.intensities),
        ];
        sink.write_row(&self.spec.name, &row)?;
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn RowSink) -> Result<(), Error> {
        if !self.begun {
            sink.begin_table(&self.spec)?;
        }
        Ok(())
    }
}
