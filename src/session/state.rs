//! Session state types
//!
//! Value types describing one live recording session and the options and
//! outcomes around its lifecycle.

use crate::camera::{Camera, Capability};
use crate::recorder::pipeline::{DEFAULT_MAX_SIZE_BYTES, DEFAULT_MAX_SIZE_TIME};
use crate::recorder::supervisor::RecorderProcess;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Logging mode for the recorder process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderLog {
    /// Write recorder output to a log file next to the recording
    File,
    /// Let the recorder write to the caller's console
    Console,
    /// Discard recorder output
    Null,
}

/// Options for starting a recording session
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Where the recorder's output goes
    pub log: RecorderLog,

    /// Maximum number of segment files kept; 0 keeps all
    pub max_files: u32,

    /// Maximum duration of one recorded segment
    pub max_size_time: Duration,

    /// Maximum size of one recorded segment in bytes
    pub max_size_bytes: u64,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            log: RecorderLog::File,
            max_files: 0,
            max_size_time: DEFAULT_MAX_SIZE_TIME,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

/// The live binding of one camera to one port and one recorder process.
///
/// Sessions are owned by the session manager's registry and destroyed only
/// after their process has been confirmed terminated.
#[derive(Debug)]
pub struct Session {
    /// The camera being recorded
    pub camera: Camera,

    /// The capability the stream was started with
    pub capability: Capability,

    /// Local port the stream arrives on
    pub port: u16,

    /// Segment file pattern the recorder writes to
    pub output_path: PathBuf,

    /// Pipeline descriptor the recorder was launched with
    pub pipeline: String,

    /// Handle to the recorder process
    pub(crate) process: RecorderProcess,

    /// Recorder log file, when file logging was requested
    pub log_path: Option<PathBuf>,

    /// When the session was started
    pub started_at: DateTime<Utc>,
}

/// Outcome of stopping a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No session was registered for the camera; nothing to do
    NotActive,

    /// Recorder stopped and the remote stream stopped
    Stopped {
        /// Segment pattern the recording was written to
        output_path: PathBuf,
    },

    /// Recorder stopped and local resources released, but the control plane
    /// rejected the stop call.
    StoppedLocally {
        output_path: PathBuf,
        remote_error: String,
    },
}
