//! Session management module
//!
//! This module implements the recording session lifecycle:
//! - Session and its start options / stop outcomes
//! - SessionManager owning the registry, the port pool and the recorder

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{RecorderLog, Session, StartOptions, StopOutcome};
