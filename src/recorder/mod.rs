//! Recorder module
//!
//! Everything around the external recording pipeline:
//! - pipeline descriptor construction
//! - process supervision (spawn, health check, bounded termination)

pub mod pipeline;
pub mod supervisor;

pub use pipeline::PipelineSpec;
pub use supervisor::{
    LogDestination, RecorderBackend, RecorderProcess, RecorderSupervisor, SupervisorConfig,
};
