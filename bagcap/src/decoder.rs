use crate::record::{Record, Stamp};
use crate::Error;

/// One decoded sweep from the packet decoder: a timestamp and an N x M
/// numeric point array (typically x, y, z, intensity, ring, time).
#[derive(Debug, Clone)]
pub struct CloudFrame {
    pub stamp: Stamp,
    pub points: Vec<Vec<f64>>,
}

/// External packet-to-point-array decoder for a spinning lidar.
///
/// Implementations are stateful: a decoder may buffer packets across calls
/// and emit zero or more complete frames per packet record.
pub trait CloudDecoder: Send {
    fn decode(&mut self, record: &Record) -> Result<Vec<CloudFrame>, Error>;
}

/// Creates one decoder per log file, so each worker owns its own decoder
/// state. Configuration (sensor model, rotation rate) lives behind the
/// factory, not in the pipeline.
pub trait CloudDecoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn CloudDecoder>;
}
