//! Frame metadata module
//!
//! Offline decoding of the per-frame metadata embedded in recorded video
//! files. Independent of the session manager; safe to run against a file
//! that is still being written.

mod extractor;

pub use extractor::{extract_metadata, FrameMetadata};
