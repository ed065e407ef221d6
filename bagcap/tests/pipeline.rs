use bag_msgs::msg::{CompressedImage, Header, LaserScan, PointCloud2, PointField, Time};
use bagcap::config::Config;
use bagcap::decoder::{CloudDecoder, CloudDecoderFactory, CloudFrame};
use bagcap::extract_log;
use bagcap::flatten::GenericMessage;
use bagcap::record::{LogReader, Payload, Record, Stamp};
use bagcap::sink::{FsSink, RowSink};
use bagcap::storage::hex_digest;
use bagcap::Error;
use indicatif::MultiProgress;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// In-memory log with canned records, tracking which topics get streamed.
struct MemReader {
    topics: HashMap<String, Vec<Record>>,
    reads: RefCell<Vec<String>>,
}

impl MemReader {
    fn new(topics: Vec<(&str, Vec<Record>)>) -> Self {
        MemReader {
            topics: topics
                .into_iter()
                .map(|(name, records)| (name.to_string(), records))
                .collect(),
            reads: RefCell::new(Vec::new()),
        }
    }

    fn read_count(&self, topic: &str) -> usize {
        self.reads.borrow().iter().filter(|t| *t == topic).count()
    }
}

impl LogReader for MemReader {
    fn topics(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.topics.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn message_count(&self, topic: &str) -> Option<u64> {
        self.topics.get(topic).map(|r| r.len() as u64)
    }

    fn read_topic<'a>(
        &'a self,
        topic: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Record, Error>> + 'a>, Error> {
        self.reads.borrow_mut().push(topic.to_string());
        let records = self.topics.get(topic).cloned().unwrap_or_default();
        Ok(Box::new(records.into_iter().map(Ok)))
    }
}

fn generic_record(seq: u64, log_time: u64, text: &str) -> Record {
    Record {
        seq,
        stamp: Stamp::from_nanos(log_time),
        log_time,
        payload: Payload::Generic(GenericMessage::from_text(text)),
    }
}

fn run(reader: &MemReader, out_dir: &Path, cfg: &Config) -> bagcap::FileReport {
    let mut sink = FsSink::new();
    let sigint = AtomicBool::new(false);
    let report = extract_log(reader, out_dir, cfg, &mut sink, &sigint, &MultiProgress::new())
        .expect("extraction should succeed");
    sink.finish().unwrap();
    report
}

fn tree_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        for entry in fs::read_dir(&d).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn generic_topic_becomes_headered_csv() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemReader::new(vec![(
        "/foo",
        vec![
            generic_record(0, 10, "x: 1"),
            generic_record(1, 20, "x: 2"),
        ],
    )]);

    let report = run(&reader, dir.path(), &Config::default());

    assert_eq!(report.records, 2);
    let content = fs::read_to_string(dir.path().join("_slash_foo.csv")).unwrap();
    assert_eq!(content, "timestamp,x\n10,1\n20,2\n");
}

#[test]
fn existing_output_is_skipped_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemReader::new(vec![("/foo", vec![generic_record(0, 10, "x: 1")])]);
    let cfg = Config::default();

    run(&reader, dir.path(), &cfg);
    let before = fs::read(dir.path().join("_slash_foo.csv")).unwrap();

    let report = run(&reader, dir.path(), &cfg);

    assert_eq!(report.skipped, vec!["/foo".to_string()]);
    // The topic was not streamed again and the file bytes are untouched.
    assert_eq!(reader.read_count("/foo"), 1);
    assert_eq!(fs::read(dir.path().join("_slash_foo.csv")).unwrap(), before);
}

#[test]
fn empty_topic_still_produces_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemReader::new(vec![("/bar", vec![])]);

    run(&reader, dir.path(), &Config::default());

    let content = fs::read_to_string(dir.path().join("_slash_bar.csv")).unwrap();
    assert_eq!(content, "");
}

#[test]
fn bad_record_is_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let bad = Record {
        payload: Payload::CloudPacket(vec![1, 2, 3]),
        ..generic_record(1, 20, "")
    };
    let reader = MemReader::new(vec![(
        "/foo",
        vec![
            generic_record(0, 10, "x: 1"),
            bad,
            generic_record(2, 30, "x: 3"),
        ],
    )]);

    let report = run(&reader, dir.path(), &Config::default());

    assert_eq!(report.records, 2);
    assert_eq!(report.bad_records, 1);
    let content = fs::read_to_string(dir.path().join("_slash_foo.csv")).unwrap();
    assert_eq!(content, "timestamp,x\n10,1\n30,3\n");
}

#[test]
fn laser_topic_rows_keep_scan_layout() {
    let dir = tempfile::tempdir().unwrap();
    let scan = LaserScan {
        header: Header {
            stamp: Time {
                sec: 100,
                nanosec: 5,
            },
            frame_id: "laser".to_string(),
        },
        angle_min: -1.5,
        angle_max: 1.5,
        angle_increment: 0.5,
        time_increment: 0.0,
        scan_time: 0.1,
        range_min: 0.2,
        range_max: 30.0,
        ranges: vec![1.0, 2.5],
        intensities: vec![7.0],
    };
    let reader = MemReader::new(vec![(
        "/sick_lms_5xx/scan",
        vec![Record {
            seq: 0,
            stamp: Stamp { sec: 100, nsec: 5 },
            log_time: 100_000_000_005,
            payload: Payload::Laser(scan),
        }],
    )]);

    run(&reader, dir.path(), &Config::default());

    let content =
        fs::read_to_string(dir.path().join("_slash_sick_lms_5xx_slash_scan.txt")).unwrap();
    // Array elements join with bare commas, indistinguishable from the
    // column separators; consumers rely on the fixed scalar prefix.
    assert_eq!(content, "0,100,5,-1.5,1.5,0.5,0,0.1,0.2,30,1,2.5,7\n");
}

struct StubDecoder;

impl CloudDecoder for StubDecoder {
    fn decode(&mut self, record: &Record) -> Result<Vec<CloudFrame>, Error> {
        Ok(vec![CloudFrame {
            stamp: record.stamp,
            points: vec![vec![1.0, 2.0, 3.0]],
        }])
    }
}

struct StubFactory;

impl CloudDecoderFactory for StubFactory {
    fn create(&self) -> Box<dyn CloudDecoder> {
        Box::new(StubDecoder)
    }
}

fn packet_record(seq: u64, sec: i64) -> Record {
    Record {
        seq,
        stamp: Stamp { sec, nsec: 0 },
        log_time: sec as u64 * 1_000_000_000,
        payload: Payload::CloudPacket(vec![0u8; 8]),
    }
}

#[test]
fn identical_frames_collapse_to_one_blob() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemReader::new(vec![(
        "/velodyne_packets",
        vec![packet_record(0, 100), packet_record(1, 101)],
    )]);
    let cfg = Config {
        cloud_decoder: Some(Arc::new(StubFactory)),
        ..Config::default()
    };

    run(&reader, dir.path(), &cfg);

    // Both frames carry the same points, so they share one stored dump.
    let blobs = tree_files(&dir.path().join("velodyne_pointcloud"));
    assert_eq!(blobs.len(), 1);
    assert_eq!(fs::read_to_string(&blobs[0]).unwrap(), "1,2,3\n");

    let index = fs::read_to_string(dir.path().join("_slash_velodyne_packets.txt")).unwrap();
    let lines: Vec<&str> = index.lines().collect();
    assert_eq!(lines.len(), 2);
    let hash = lines[0].rsplit(',').next().unwrap();
    assert_eq!(lines[0], format!("0,100,0,{hash}"));
    assert_eq!(lines[1], format!("1,101,0,{hash}"));
}

#[test]
fn packet_topic_without_decoder_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemReader::new(vec![("/velodyne_packets", vec![packet_record(0, 100)])]);

    let report = run(&reader, dir.path(), &Config::default());

    assert_eq!(report.skipped, vec!["/velodyne_packets".to_string()]);
    assert_eq!(reader.read_count("/velodyne_packets"), 0);
    assert!(!dir.path().join("_slash_velodyne_packets.txt").exists());
}

#[test]
fn cloud_metadata_writes_geometry_and_field_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let cloud = PointCloud2 {
        header: Header {
            stamp: Time {
                sec: 100,
                nanosec: 7,
            },
            frame_id: "velodyne".to_string(),
        },
        height: 1,
        width: 2,
        fields: vec![
            PointField {
                name: "x".to_string(),
                offset: 0,
                datatype: 7,
                count: 1,
            },
            PointField {
                name: "y".to_string(),
                offset: 4,
                datatype: 7,
                count: 1,
            },
        ],
        is_bigendian: false,
        point_step: 16,
        row_step: 32,
        data: vec![],
        is_dense: true,
    };
    let reader = MemReader::new(vec![(
        "/velodyne_points",
        vec![Record {
            seq: 0,
            stamp: Stamp { sec: 100, nsec: 7 },
            log_time: 100_000_000_007,
            payload: Payload::CloudMeta(cloud),
        }],
    )]);

    run(&reader, dir.path(), &Config::default());

    let geometry = fs::read_to_string(dir.path().join("_slash_velodyne_points.txt")).unwrap();
    assert_eq!(geometry, "0,100,7,1,2,false,16,32,true\n");
    let info = fs::read_to_string(dir.path().join("velodyne_info.txt")).unwrap();
    assert_eq!(info, "x:0:7:1, y:4:7:1\n");
}

#[test]
fn camera_frame_is_stored_pixel_keyed_and_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let pixels = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
    let mut png = Vec::new();
    pixels
        .write_with_encoder(image::codecs::png::PngEncoder::new(&mut png))
        .unwrap();

    let topic = "/front_center_camera/image_color/compressed";
    let reader = MemReader::new(vec![(
        topic,
        vec![Record {
            seq: 0,
            stamp: Stamp { sec: 0, nsec: 0 },
            log_time: 0,
            payload: Payload::Image(CompressedImage {
                header: Header {
                    stamp: Time { sec: 0, nanosec: 0 },
                    frame_id: "cam".to_string(),
                },
                format: "png".to_string(),
                data: png,
            }),
        }],
    )]);

    run(&reader, dir.path(), &Config::default());

    // The blob key is the digest of the decoded RGB8 pixel buffer, stored
    // under the camera's own shard subtree.
    let hash = hex_digest(pixels.as_raw());
    let blob = dir
        .path()
        .join("images")
        .join("front_center_camera")
        .join(&hash[0..2])
        .join(&hash[2..4])
        .join(format!("{}.jpg", hash));
    assert!(blob.is_file());

    let index = fs::read_to_string(
        dir.path()
            .join("_slash_front_center_camera_slash_image_color_slash_compressed.txt"),
    )
    .unwrap();
    assert_eq!(
        index,
        format!("0,1970-01-01 00:00:00,0,0,0.000000000,{hash}\n")
    );
}

#[test]
fn disabled_cameras_produce_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let camera_topic = "/front_center_camera/image_color/compressed";
    let reader = MemReader::new(vec![(camera_topic, vec![])]);
    let cfg = Config {
        parse_cameras: false,
        ..Config::default()
    };

    run(&reader, dir.path(), &cfg);

    assert_eq!(reader.read_count(camera_topic), 0);
    assert_eq!(tree_files(dir.path()).len(), 0);
}
