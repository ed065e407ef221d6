use crate::extract::Extractor;
use crate::flatten::Flat;
use crate::record::{Payload, Record};
use crate::sink::{Column, RowFormat, RowSink, TableSpec};
use crate::Error;
use log::warn;
use std::path::PathBuf;

/// Everything without a specialized extractor: one CSV row per record, header
/// derived from the first record's field names.
pub struct GenericExtractor {
    topic: String,
    path: PathBuf,
    header_len: Option<usize>,
    warned_drift: bool,
}

impl GenericExtractor {
    pub fn new(topic: &str, path: PathBuf) -> Self {
        GenericExtractor {
            topic: topic.to_string(),
            path,
            header_len: None,
            warned_drift: false,
        }
    }

    fn begin(&mut self, names: &[String], sink: &mut dyn RowSink) -> Result<(), Error> {
        let mut columns = vec![Column::text("timestamp")];
        columns.extend(names.iter().map(|n| Column::text(n)));
        sink.begin_table(&TableSpec {
            name: self.topic.clone(),
            path: self.path.clone(),
            format: RowFormat::Csv,
            columns,
        })?;
        self.header_len = Some(names.len());
        Ok(())
    }
}

impl Extractor for GenericExtractor {
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error> {
        let Payload::Generic(msg) = &record.payload else {
            return Err(Error::Decode(format!(
                "unexpected payload on generic topic {}",
                self.topic
            )));
        };
        if self.header_len.is_none() {
            self.begin(&msg.field_names(), sink)?;
        }

        let values = msg.field_values();
        if Some(values.len()) != self.header_len && !self.warned_drift {
            // Rows are still written positionally; columns after the drift
            // point no longer line up with the header.
            warn!(
                "Field count changed on {}: header has {}, record {} has {}",
                self.topic,
                self.header_len.unwrap_or(0),
                record.seq,
                values.len()
            );
            self.warned_drift = true;
        }

        let mut row = Vec::with_capacity(values.len() + 1);
        row.push(record.log_time.to_string());
        row.extend(values);
        sink.write_row(&self.topic, &row)?;
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn RowSink) -> Result<(), Error> {
        if self.header_len.is_none() {
            // Empty topic: create the output file so the run stays resumable,
            // with no header to derive it from.
            sink.begin_table(&TableSpec {
                name: self.topic.clone(),
                path: self.path.clone(),
                format: RowFormat::Csv,
                columns: vec![],
            })?;
        }
        Ok(())
    }
}
