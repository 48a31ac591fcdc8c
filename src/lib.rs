//! camlink - client-side orchestration for remote camera-streaming hardware.
//!
//! Talks to the HTTP control plane that starts and stops camera streams,
//! supervises one external recording pipeline per camera, and decodes the
//! per-frame metadata embedded in the recorded files.
//!
//! The [`SessionManager`] is the entry point for recording:
//!
//! ```no_run
//! use camlink::{SessionManager, StartOptions};
//! use std::path::Path;
//!
//! # fn main() -> camlink::Result<()> {
//! let mut manager = SessionManager::connect("192.168.177.100", 8000)?;
//! let cameras = manager.list_cameras()?;
//! let camera = cameras.first().expect("no cameras");
//! let capability = camera.jpeg_caps().next().expect("no JPEG capability").clone();
//!
//! let session = manager.start(
//!     camera,
//!     &capability,
//!     Path::new("./recordings"),
//!     &StartOptions::default(),
//! )?;
//! println!("recording to {}", session.output_path.display());
//!
//! manager.stop(camera.id)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`extract_metadata`] runs independently, against files a recorder
//! produced earlier.

pub mod camera;
pub mod error;
pub mod metadata;
pub mod ports;
pub mod recorder;
pub mod remote;
pub mod session;

pub use camera::{Camera, Capability, MEDIA_TYPE_JPEG};
pub use error::{Error, Result};
pub use metadata::{extract_metadata, FrameMetadata};
pub use ports::PortPool;
pub use remote::{ControlPlane, RemoteClient};
pub use session::{RecorderLog, Session, SessionManager, StartOptions, StopOutcome};
