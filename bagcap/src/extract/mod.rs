use crate::record::Record;
use crate::sink::RowSink;
use crate::Error;

mod camera;
mod cloud;
mod generic;
mod laser;

pub use camera::CameraExtractor;
pub use cloud::{CloudMetaExtractor, CloudPacketExtractor};
pub use generic::GenericExtractor;
pub use laser::LaserExtractor;

/// Per-topic extraction.
pub trait Extractor {
    /// Called for every record of the topic, in arrival order. An
    /// `Error::Decode` return marks the record as bad without aborting the
    /// topic; any other error aborts the file.
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error>;

    /// Called once after the last record, even for an empty topic.
    fn finish(&mut self, sink: &mut dyn RowSink) -> Result<(), Error>;
}
