use crate::flatten::GenericMessage;
use crate::Error;
use bag_msgs::msg::{CompressedImage, LaserScan, PointCloud2};

/// Message timestamp as a (seconds, nanoseconds) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub sec: i64,
    pub nsec: u32,
}

impl Stamp {
    pub fn from_nanos(t: u64) -> Self {
        Stamp {
            sec: (t / 1_000_000_000) as i64,
            nsec: (t % 1_000_000_000) as u32,
        }
    }
}

/// Decoded message body of one record.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Planar range-scanner sweep.
    Laser(LaserScan),
    /// Point cloud metadata and its packed point buffer.
    CloudMeta(PointCloud2),
    /// Still-encoded lidar packet payload, decoded by an external
    /// [`CloudDecoder`](crate::decoder::CloudDecoder).
    CloudPacket(Vec<u8>),
    /// Compressed camera frame.
    Image(CompressedImage),
    /// Anything else, exposed through its textual name/value form.
    Generic(GenericMessage),
}

/// One timestamped message instance on a topic.
#[derive(Debug, Clone)]
pub struct Record {
    /// Per-topic record index assigned by the reader, starting at 0.
    pub seq: u64,
    /// Sensor timestamp from the message header where the message carries
    /// one, otherwise derived from `log_time`.
    pub stamp: Stamp,
    /// Arrival time in the log, nanoseconds since epoch.
    pub log_time: u64,
    pub payload: Payload,
}

/// Read-only view of one recorded log file.
///
/// The container format stays behind this trait: the pipeline only sees
/// topic names, per-topic message counts, and ordered record streams.
pub trait LogReader {
    /// Topic names present in the log.
    fn topics(&self) -> Result<Vec<String>, Error>;

    /// Message count for a topic, when the container indexes it.
    fn message_count(&self, topic: &str) -> Option<u64>;

    /// Stream the records of one topic in arrival order. Per-record decode
    /// failures surface as `Error::Decode` items so one bad record does not
    /// void the topic.
    fn read_topic<'a>(
        &'a self,
        topic: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Record, Error>> + 'a>, Error>;
}
