use crate::config::Rotation;
use crate::extract::Extractor;
use crate::record::{Payload, Record};
use crate::sink::{Column, RowFormat, RowSink, TableSpec};
use crate::storage::BlobStore;
use crate::Error;
use std::path::{Path, PathBuf};

/// Camera topics: each compressed frame is decoded, optionally rotated,
/// re-encoded as JPEG (quality 100) into a per-camera blob subtree keyed by
/// the digest of the decoded pixel buffer, and indexed with one line per
/// frame in the topic's text file.
pub struct CameraExtractor {
    spec: TableSpec,
    store: BlobStore,
    rotation: Rotation,
    begun: bool,
}

impl CameraExtractor {
    pub fn new(topic: &str, path: PathBuf, out_dir: &Path, rotation: Rotation) -> Self {
        let columns = vec![
            Column::integer("seq"),
            Column::text("time"),
            Column::integer("secs"),
            Column::integer("nsecs"),
            Column::real("timestamp"),
            Column::text("md5"),
        ];
        CameraExtractor {
            spec: TableSpec {
                name: topic.to_string(),
                path,
                format: RowFormat::Plain,
                columns,
            },
            store: BlobStore::new(out_dir.join("images").join(camera_prefix(topic))),
            rotation,
            begun: false,
        }
    }
}

/// Blob subtree prefix derived from the topic, so each camera owns a
/// disjoint shard tree even when two cameras produce identical frames.
pub fn camera_prefix(topic: &str) -> String {
    let trimmed = topic.trim_start_matches('/');
    for suffix in ["image_color/compressed", "image_rect_color/compressed"] {
        if let Some(prefix) = trimmed.strip_suffix(suffix) {
            return prefix.trim_end_matches('/').to_string();
        }
    }
    trimmed.replace('/', "_")
}

fn human_time(sec: i64) -> String {
    chrono::DateTime::from_timestamp(sec, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

impl Extractor for CameraExtractor {
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error> {
        let Payload::Image(frame) = &record.payload else {
            return Err(Error::Decode(format!(
                "unexpected payload on camera topic {}",
                self.spec.name
            )));
        };
        if !self.begun {
            sink.begin_table(&self.spec)?;
            self.begun = true;
        }

        let decoded = image::load_from_memory(&frame.data)
            .map_err(|e| Error::Decode(format!("image decode failed: {e}")))?;
        let decoded = match self.rotation {
            Rotation::None => decoded,
            Rotation::Deg90 => decoded.rotate90(),
            Rotation::Deg180 => decoded.rotate180(),
            Rotation::Deg270 => decoded.rotate270(),
        };

        // The digest covers the canonical RGB8 pixel buffer, not the JPEG
        // bytes, so the hash does not depend on encoder output details.
        let pixels = decoded.to_rgb8();
        let mut jpeg = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 100);
        pixels
            .write_with_encoder(encoder)
            .map_err(|e| Error::Decode(format!("jpeg encode failed: {e}")))?;
        let hash = self.store.put_keyed(pixels.as_raw(), &jpeg, "jpg")?;

        let row = vec![
            record.seq.to_string(),
            human_time(record.stamp.sec),
            record.stamp.sec.to_string(),
            record.stamp.nsec.to_string(),
            format!("{}.{:09}", record.stamp.sec, record.stamp.nsec),
            hash,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_prefix_strips_image_suffixes() {
        assert_eq!(
            camera_prefix("/front_center_camera/image_color/compressed"),
            "front_center_camera"
        );
        assert_eq!(
            camera_prefix("/rear_left_camera/image_rect_color/compressed"),
            "rear_left_camera"
        );
        assert_eq!(camera_prefix("/odd/topic"), "odd_topic");
    }

    #[test]
    fn human_time_is_utc_formatted() {
        assert_eq!(human_time(0), "1970-01-01 00:00:00");
    }
}
