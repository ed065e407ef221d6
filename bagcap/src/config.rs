use crate::decoder::CloudDecoderFactory;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Quarter-turn rotation applied to decoded camera frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

/// Pipeline configuration, passed explicitly into every run.
///
/// The topic classification table is data, not code: the defaults mirror the
/// capture vehicle's channel layout but nothing in the pipeline depends on
/// these exact names.
#[derive(Clone)]
pub struct Config {
    /// Camera topics extracted through the image pipeline (closed set).
    pub camera_topics: Vec<String>,

    /// Topics never extracted at all, e.g. raw variants of camera channels
    /// that would otherwise fall through to the generic serializer.
    pub ignore_topics: Vec<String>,

    /// Range-scanner topics emitted as fixed-width text lines.
    pub laser_topics: Vec<String>,

    /// Point-cloud metadata topic.
    pub cloud_meta_topic: String,

    /// Raw lidar packet topic, decoded via `cloud_decoder`.
    pub cloud_packet_topic: String,

    /// When false, camera topics are dropped from the routing table and no
    /// output file is produced for them.
    pub parse_cameras: bool,

    /// Per-topic rotation applied to decoded camera frames.
    pub camera_rotation: HashMap<String, Rotation>,

    /// External packet decoder; the packet topic is skipped with a warning
    /// when absent.
    pub cloud_decoder: Option<Arc<dyn CloudDecoderFactory>>,

    /// Write rows into this SQLite database instead of flat files. Blobs
    /// always stay on the filesystem.
    pub database: Option<PathBuf>,

    /// Base directory for output trees; next to each input file when absent.
    pub output_dir: Option<PathBuf>,

    /// Worker pool size for the file-level fan-out. 0 uses all cores.
    pub jobs: usize,
}

impl Config {
    pub fn rotation_for(&self, topic: &str) -> Rotation {
        self.camera_rotation.get(topic).copied().unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            camera_topics: vec![
                "/rear_left_camera/image_rect_color/compressed".to_string(),
                "/rear_center_camera/image_rect_color/compressed".to_string(),
                "/rear_right_camera/image_rect_color/compressed".to_string(),
                "/front_left_camera/image_color/compressed".to_string(),
                "/front_center_camera/image_color/compressed".to_string(),
                "/front_right_camera/image_color/compressed".to_string(),
            ],
            ignore_topics: vec![
                "/rear_left_camera/image_rect_color".to_string(),
                "/rear_center_camera/image_rect_color".to_string(),
                "/rear_right_camera/image_rect_color".to_string(),
                "/rear_left_camera/image_color/compressed".to_string(),
                "/rear_center_camera/image_color/compressed".to_string(),
                "/rear_right_camera/image_color/compressed".to_string(),
            ],
            laser_topics: vec![
                "/sick_lms_5xx/scan".to_string(),
                "/sick_lms500/scan".to_string(),
            ],
            cloud_meta_topic: "/velodyne_points".to_string(),
            cloud_packet_topic: "/velodyne_packets".to_string(),
            parse_cameras: true,
            camera_rotation: HashMap::new(),
            cloud_decoder: None,
            database: None,
            output_dir: None,
            jobs: 0,
        }
    }
}
