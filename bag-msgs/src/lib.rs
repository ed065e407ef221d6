//! # bag-msgs
//!
//! Message definitions for the sensor channels found in recorded bag files.
//!
pub mod msg {
    use serde::Deserialize;

    /// Time indicates a specific point in time, relative to a clock's 0 point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
    pub struct Time {
        /// The seconds component, valid over all int32 values.
        pub sec: i32,

        /// The nanoseconds component, valid in the range [0, 10e9).
        pub nanosec: u32,
    }

    /// Standard metadata for higher-level stamped data types.
    /// Two-integer timestamp that is expressed as seconds and nanoseconds,
    /// plus the transform frame with which this data is associated.
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
    pub struct Header {
        pub stamp: Time,
        pub frame_id: String,
    }

    /// Single scan from a planar laser range-finder.
    ///
    /// Ranges and intensities are index-aligned; `ranges.len()` readings
    /// starting at `angle_min`, spaced by `angle_increment`.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct LaserScan {
        pub header: Header,

        /// Start angle of the scan [rad]
        pub angle_min: f32,

        /// End angle of the scan [rad]
        pub angle_max: f32,

        /// Angular distance between measurements [rad]
        pub angle_increment: f32,

        /// Time between measurements [seconds]
        pub time_increment: f32,

        /// Time between scans [seconds]
        pub scan_time: f32,

        /// Minimum range value [m]
        pub range_min: f32,

        /// Maximum range value [m]
        pub range_max: f32,

        /// Range data [m]. Values outside (range_min, range_max) should be discarded.
        pub ranges: Vec<f32>,

        /// Intensity data, device-specific units. Empty if unsupported.
        pub intensities: Vec<f32>,
    }

    /// This message holds the description of one point entry in the
    /// PointCloud2 message format.
    ///
    /// uint8 INT8 = 1
    /// uint8 UINT8 = 2
    /// uint8 INT16 = 3
    /// uint8 UINT16 = 4
    /// uint8 INT32 = 5
    /// uint8 UINT32 = 6
    /// uint8 FLOAT32 = 7
    /// uint8 FLOAT64 = 8
    ///
    /// Common PointField names are x, y, z, intensity, rgb, rgba
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
    pub struct PointField {
        pub name: String,
        pub offset: u32,
        pub datatype: u8,
        pub count: u32,
    }

    /// This message holds a collection of N-dimensional points, which may
    /// contain additional information such as normals, intensity, etc. The
    /// point data is stored as a binary blob, its layout described by the
    /// contents of the "fields" array.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct PointCloud2 {
        pub header: Header,

        /// 2D structure of the point cloud. If the cloud is unordered,
        /// height is 1 and width is the length of the point cloud.
        pub height: u32,
        pub width: u32,

        /// Describes the channels and their layout in the binary data blob.
        pub fields: Vec<PointField>,

        pub is_bigendian: bool,

        /// Length of a point in bytes
        pub point_step: u32,

        /// Length of a row in bytes
        pub row_step: u32,

        /// Actual point data, size is (row_step*height)
        pub data: Vec<u8>,

        /// True if there are no invalid points
        pub is_dense: bool,
    }

    /// This message contains a compressed image.
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
    pub struct CompressedImage {
        /// Header timestamp should be acquisition time of image
        pub header: Header,

        /// Specifies the format of the data. Acceptable values: jpeg, png
        pub format: String,

        /// Compressed image buffer
        pub data: Vec<u8>,
    }
}
