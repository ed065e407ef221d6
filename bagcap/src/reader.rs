use crate::flatten::GenericMessage;
use crate::record::{LogReader, Payload, Record, Stamp};
use crate::Error;
use bag_msgs::msg::{CompressedImage, Header, LaserScan, PointCloud2};
use log::warn;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const LASER_SCAN_SCHEMA: &str = "sensor_msgs/msg/LaserScan";
const POINT_CLOUD_SCHEMA: &str = "sensor_msgs/msg/PointCloud2";
const COMPRESSED_IMAGE_SCHEMA: &str = "sensor_msgs/msg/CompressedImage";
const PACKET_SCHEMA: &str = "velodyne_msgs/msg/VelodyneScan";

/// One named channel of a log file, for the pre-extraction summary.
pub struct Topic {
    pub name: String,
    pub format: String,
    pub description: String,
    pub msg_count: Option<u64>,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, msgs: {}, {}, {}",
            self.name,
            match self.msg_count {
                Some(n) => n.to_string(),
                None => "Unknown".to_owned(),
            },
            self.format,
            self.description
        )
    }
}

/// Collect the merged topic list of a set of log files, with message counts
/// where the container indexes them.
pub fn summary(files: &[PathBuf]) -> Result<Vec<Topic>, Error> {
    let mut topics: HashMap<String, Topic> = HashMap::new();

    for file in files {
        let fd = fs::File::open(file)?;
        let mmap = unsafe { memmap2::Mmap::map(&fd)? };
        let summary = match mcap::read::Summary::read(&mmap) {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                warn!("No summary section in {}", file.display());
                continue;
            }
            Err(e) => {
                warn!("Failed to read summary from {}: {}", file.display(), e);
                continue;
            }
        };
        let stats = summary
            .stats
            .ok_or(Error::NoStatistics(file.display().to_string()))?;

        for (id, chn) in summary.channels {
            let count = stats.channel_message_counts.get(&id).copied();
            let (format, encoding) = match &chn.schema {
                Some(s) => (s.name.clone(), s.encoding.clone()),
                None => ("unknown".to_string(), "unknown".to_string()),
            };
            topics
                .entry(chn.topic.clone())
                .and_modify(|t| {
                    t.msg_count = match (t.msg_count, count) {
                        (Some(a), Some(b)) => Some(a + b),
                        _ => None,
                    };
                })
                .or_insert(Topic {
                    name: chn.topic.clone(),
                    format,
                    description: format!("Encoding: {}", encoding),
                    msg_count: count,
                });
        }
    }

    let mut topics: Vec<Topic> = topics.into_values().collect();
    topics.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(topics)
}

/// MCAP-backed log reader. The file is memory-mapped once; each per-topic
/// read streams the message sequence again and decodes only that topic.
pub struct McapReader {
    mmap: memmap2::Mmap,
    names: Vec<String>,
    counts: HashMap<String, u64>,
}

impl McapReader {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let fd = fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&fd)? };
        let summary = mcap::read::Summary::read(&mmap)?
            .ok_or(Error::NoSummary(path.display().to_string()))?;
        let stats = summary
            .stats
            .ok_or(Error::NoStatistics(path.display().to_string()))?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for (id, chn) in &summary.channels {
            if let Some(n) = stats.channel_message_counts.get(id) {
                *counts.entry(chn.topic.clone()).or_insert(0) += n;
            }
        }
        let mut names: Vec<String> = summary
            .channels
            .values()
            .map(|chn| chn.topic.clone())
            .collect();
        names.sort();
        names.dedup();

        Ok(McapReader {
            mmap,
            names,
            counts,
        })
    }
}

impl LogReader for McapReader {
    fn topics(&self) -> Result<Vec<String>, Error> {
        Ok(self.names.clone())
    }

    fn message_count(&self, topic: &str) -> Option<u64> {
        self.counts.get(topic).copied()
    }

    fn read_topic<'a>(
        &'a self,
        topic: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Record, Error>> + 'a>, Error> {
        let stream = mcap::MessageStream::new(&self.mmap)?;
        let topic = topic.to_string();
        let mut seq = 0u64;
        Ok(Box::new(stream.filter_map(move |message| {
            let msg = match message {
                Ok(msg) => msg,
                Err(e) => return Some(Err(Error::Mcap(e))),
            };
            if msg.channel.topic != topic {
                return None;
            }
            let record = decode_message(&msg, seq);
            seq += 1;
            Some(record)
        })))
    }
}

fn decode_message(msg: &mcap::Message, seq: u64) -> Result<Record, Error> {
    let (schema, encoding) = match &msg.channel.schema {
        Some(s) => (s.name.as_str(), s.encoding.as_str()),
        None => ("", ""),
    };
    let data: &[u8] = msg.data.as_ref();

    let payload = match schema {
        LASER_SCAN_SCHEMA => Payload::Laser(decode_cdr::<LaserScan>(data)?),
        POINT_CLOUD_SCHEMA => Payload::CloudMeta(decode_cdr::<PointCloud2>(data)?),
        COMPRESSED_IMAGE_SCHEMA => Payload::Image(decode_cdr::<CompressedImage>(data)?),
        // Packet payloads stay encoded; the external cloud decoder owns them.
        PACKET_SCHEMA => Payload::CloudPacket(data.to_vec()),
        _ if encoding == "json" => Payload::Generic(
            GenericMessage::from_json(data)
                .map_err(|e| Error::Decode(format!("json decode failed: {e}")))?,
        ),
        _ => {
            return Err(Error::Decode(format!(
                "no decoder for schema {schema} ({encoding})"
            )))
        }
    };

    let stamp = match &payload {
        Payload::Laser(m) => header_stamp(&m.header),
        Payload::CloudMeta(m) => header_stamp(&m.header),
        Payload::Image(m) => header_stamp(&m.header),
        _ => Stamp::from_nanos(msg.log_time),
    };

    Ok(Record {
        seq,
        stamp,
        log_time: msg.log_time,
        payload,
    })
}

fn header_stamp(header: &Header) -> Stamp {
    Stamp {
        sec: header.stamp.sec as i64,
        nsec: header.stamp.nanosec,
    }
}

fn decode_cdr<T: DeserializeOwned>(data: &[u8]) -> Result<T, Error> {
    cdr::deserialize_from::<_, T, _>(data, cdr::size::Infinite)
        .map_err(|e| Error::Decode(format!("cdr decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("broken.mcap");
        fs::write(&bogus, b"not an mcap file").unwrap();

        // One unreadable file must not abort the batch before it starts.
        let topics = summary(&[bogus]).unwrap();
        assert!(topics.is_empty());
    }
}
