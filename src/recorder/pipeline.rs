//! Recording pipeline descriptors
//!
//! Builds the launch descriptor for the external GStreamer recording
//! pipeline: SRT stream in, JPEG parse, segmented Matroska out.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default SRT receive latency handed to the pipeline, in milliseconds
pub const DEFAULT_LATENCY_MS: u32 = 500;
/// Default maximum duration of one recorded segment
pub const DEFAULT_MAX_SIZE_TIME: Duration = Duration::from_secs(3600);
/// Default maximum size of one recorded segment in bytes (2 GB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 2_000_000_000;

/// Parameters of one recording pipeline
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    /// Stream source, e.g. `srt://192.168.177.100:9001`
    pub stream_uri: String,

    /// SRT receive latency in milliseconds
    pub latency_ms: u32,

    /// Segment file pattern, e.g. `/tmp/rec/7_Cam_A_20260806_120000-%02d.mkv`
    pub output_location: PathBuf,

    /// Maximum number of segment files kept; 0 keeps all
    pub max_files: u32,

    /// Maximum duration of one segment
    pub max_size_time: Duration,

    /// Maximum size of one segment in bytes
    pub max_size_bytes: u64,
}

impl PipelineSpec {
    /// Pipeline recording the stream of `host`:`port` to `output_location`
    pub fn new(host: &str, port: u16, output_location: PathBuf) -> Self {
        Self {
            stream_uri: format!("srt://{}:{}", host, port),
            latency_ms: DEFAULT_LATENCY_MS,
            output_location,
            max_files: 0,
            max_size_time: DEFAULT_MAX_SIZE_TIME,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }

    /// Render the full `gst-launch-1.0` command for this pipeline.
    ///
    /// The whole pipeline is one descriptor string run through the platform
    /// shell, so the recorder can be swapped without touching the supervisor.
    pub fn command(&self) -> String {
        let mut command = format!(
            "gst-launch-1.0 -e srtclientsrc uri={} latency={} ! queue ! jpegparse ! \
             splitmuxsink max-size-time={} max-size-bytes={}",
            self.stream_uri,
            self.latency_ms,
            self.max_size_time.as_nanos(),
            self.max_size_bytes,
        );
        if self.max_files > 0 {
            command.push_str(&format!(" max-files={}", self.max_files));
        }
        command.push_str(&format!(
            " muxer-factory=matroskamux location={}",
            normalize_location(&self.output_location)
        ));
        command
    }
}

/// Segment pattern as the pipeline expects it.
///
/// GStreamer takes forward slashes on every platform, so Windows paths are
/// normalized.
fn normalize_location(location: &Path) -> String {
    let location = location.to_string_lossy();
    if cfg!(windows) {
        location.replace('\\', "/")
    } else {
        location.into_owned()
    }
}
