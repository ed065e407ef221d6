use crate::decoder::CloudDecoder;
use crate::extract::Extractor;
use crate::record::{Payload, Record};
use crate::sink::{Column, RowFormat, RowSink, TableSpec};
use crate::storage::BlobStore;
use crate::Error;
use bag_msgs::msg::PointField;
use std::path::PathBuf;

/// Point-cloud metadata topic: one line of cloud geometry per record, plus a
/// sibling descriptor file listing the per-point field layout.
pub struct CloudMetaExtractor {
    spec: TableSpec,
    info_spec: TableSpec,
    begun: bool,
}

impl CloudMetaExtractor {
    pub fn new(topic: &str, path: PathBuf, info_path: PathBuf) -> Self {
        let columns = vec![
            Column::integer("seq"),
            Column::integer("secs"),
            Column::integer("nsecs"),
            Column::integer("height"),
            Column::integer("width"),
            Column::integer("is_bigendian"),
            Column::integer("point_step"),
            Column::integer("row_step"),
            Column::integer("is_dense"),
        ];
        CloudMetaExtractor {
            spec: TableSpec {
                name: topic.to_string(),
                path,
                format: RowFormat::Plain,
                columns,
            },
            info_spec: TableSpec {
                name: "velodyne_info".to_string(),
                path: info_path,
                format: RowFormat::Plain,
                columns: vec![Column::text("fields")],
            },
            begun: false,
        }
    }
}

fn describe_fields(fields: &[PointField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}:{}:{}:{}", f.name, f.offset, f.datatype, f.count))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Extractor for CloudMetaExtractor {
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error> {
        let Payload::CloudMeta(cloud) = &record.payload else {
            return Err(Error::Decode(format!(
                "unexpected payload on cloud topic {}",
                self.spec.name
            )));
        };
        if !self.begun {
            sink.begin_table(&self.spec)?;
            sink.begin_table(&self.info_spec)?;
            self.begun = true;
        }
        sink.write_row(&self.info_spec.name, &[describe_fields(&cloud.fields)])?;
        let row = vec![
            record.seq.to_string(),
            record.stamp.sec.to_string(),
            record.stamp.nsec.to_string(),
            cloud.height.to_string(),
            cloud.width.to_string(),
            cloud.is_bigendian.to_string(),
            cloud.point_step.to_string(),
            cloud.row_step.to_string(),
            cloud.is_dense.to_string(),
        ];
        sink.write_row(&self.spec.name, &row)?;
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn RowSink) -> Result<(), Error> {
        if !self.begun {
            sink.begin_table(&self.spec)?;
            sink.begin_table(&self.info_spec)?;
        }
        Ok(())
    }
}

/// Lidar packet topic: packets run through the external decoder, each decoded
/// frame is stored once in the blob store, and an index line maps
/// `{frame counter, stamp, hash}` to the stored dump.
pub struct CloudPacketExtractor {
    spec: TableSpec,
    store: BlobStore,
    decoder: Box<dyn CloudDecoder>,
    begun: bool,
    count: u64,
}

impl CloudPacketExtractor {
    pub fn new(
        topic: &str,
        path: PathBuf,
        store_root: PathBuf,
        decoder: Box<dyn CloudDecoder>,
    ) -> Self {
        let columns = vec![
            Column::integer("seq"),
            Column::integer("secs"),
            Column::integer("nsecs"),
            Column::text("md5"),
        ];
        CloudPacketExtractor {
            spec: TableSpec {
                name: topic.to_string(),
                path,
                format: RowFormat::Plain,
                columns,
            },
            store: BlobStore::new(store_root),
            decoder,
            begun: false,
            count: 0,
        }
    }
}

impl Extractor for CloudPacketExtractor {
    fn step(&mut self, record: &Record, sink: &mut dyn RowSink) -> Result<(), Error> {
        if !matches!(record.payload, Payload::CloudPacket(_)) {
            return Err(Error::Decode(format!(
                "unexpected payload on packet topic {}",
                self.spec.name
            )));
        }
        if !self.begun {
            sink.begin_table(&self.spec)?;
            self.begun = true;
        }
        for frame in self.decoder.decode(record)? {
            let hash = self.store.put_matrix(&frame.points)?;
            let row = vec![
                self.count.to_string(),
                frame.stamp.sec.to_string(),
                frame.stamp.nsec.to_string(),
                hash,
            ];
            sink.write_row(&self.spec.name, &row)?;
            self.count += 1;
        }
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn RowSink) -> Result<(), Error> {
        if !self.begun {
            sink.begin_table(&self.spec)?;
        }
        Ok(())
    }
}
