//! Session lifecycle orchestration
//!
//! Composes the port pool, the control-plane client and the recorder
//! supervisor into start/stop/cleanup semantics keyed by camera id.

use crate::camera::{Camera, Capability, MEDIA_TYPE_JPEG};
use crate::error::{Error, Result};
use crate::ports::PortPool;
use crate::recorder::pipeline::PipelineSpec;
use crate::recorder::supervisor::{LogDestination, RecorderBackend, RecorderSupervisor};
use crate::remote::{ControlPlane, RemoteClient};
use crate::session::state::{RecorderLog, Session, StartOptions, StopOutcome};
use chrono::{Local, Utc};
use std::collections::HashMap;
use std::path::Path;

/// Owns the session registry and drives the full lifecycle of each
/// recording session.
///
/// The registry is not internally synchronized: the manager takes `&mut
/// self` for every mutation, so one logical caller at a time drives it and
/// the one-session-per-camera and unique-port invariants hold by
/// construction.
pub struct SessionManager {
    remote: Box<dyn ControlPlane>,
    recorder: Box<dyn RecorderBackend>,
    ports: PortPool,
    sessions: HashMap<u32, Session>,
    cleaned_up: bool,
}

impl SessionManager {
    /// Connect to the control plane and build a manager with the default
    /// recorder supervisor.
    ///
    /// Fails with [`Error::Connectivity`] if the control plane is
    /// unreachable; no session state is created in that case.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let remote = RemoteClient::connect(host, port)?;
        Ok(Self::new(
            Box::new(remote),
            Box::new(RecorderSupervisor::default()),
        ))
    }

    /// Build a manager from explicit backends
    pub fn new(remote: Box<dyn ControlPlane>, recorder: Box<dyn RecorderBackend>) -> Self {
        Self {
            remote,
            recorder,
            ports: PortPool::default(),
            sessions: HashMap::new(),
            cleaned_up: false,
        }
    }

    /// Replace the default stream port range
    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.ports = PortPool::new(start, end);
        self
    }

    /// List the cameras the control plane knows about
    pub fn list_cameras(&self) -> Result<Vec<Camera>> {
        self.remote.list_cameras()
    }

    /// The session registered for a camera, if any
    pub fn session(&self, camera_id: u32) -> Option<&Session> {
        self.sessions.get(&camera_id)
    }

    /// Whether a camera currently has a registered session
    pub fn is_streaming(&self, camera_id: u32) -> bool {
        self.sessions.contains_key(&camera_id)
    }

    /// All registered sessions, in no particular order
    pub fn active_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Start streaming `camera` with `capability` and record it under
    /// `output_dir`.
    ///
    /// Calling `start` again for a camera that already has a session is a
    /// no-op that returns the existing session: no remote call, no port
    /// allocation, no new process.
    pub fn start(
        &mut self,
        camera: &Camera,
        capability: &Capability,
        output_dir: &Path,
        options: &StartOptions,
    ) -> Result<&Session> {
        if !capability.is_jpeg() {
            return Err(Error::Validation(format!(
                "unsupported media type '{}': only {} streams can be recorded",
                capability.media_type, MEDIA_TYPE_JPEG
            )));
        }

        if self.sessions.contains_key(&camera.id) {
            tracing::info!(
                camera_id = camera.id,
                port = self.sessions[&camera.id].port,
                "Camera already streaming, returning existing session"
            );
            return Ok(&self.sessions[&camera.id]);
        }

        let port = self.ports.allocate()?;
        let descriptor = capability.descriptor();

        if let Err(e) = self.remote.start_stream(camera.id, port, &descriptor) {
            tracing::error!(camera_id = camera.id, error = %e, "Remote start failed");
            self.ports.release(port);
            return Err(e);
        }

        match self.launch_recorder(camera, capability, output_dir, options, port) {
            Ok(session) => {
                tracing::info!(
                    camera_id = camera.id,
                    port,
                    output = %session.output_path.display(),
                    "Recording session started"
                );
                self.sessions.insert(camera.id, session);
                Ok(&self.sessions[&camera.id])
            }
            Err(e) => {
                // The remote stream is running with no recorder attached;
                // roll it back before surfacing the launch error.
                tracing::error!(camera_id = camera.id, error = %e, "Recorder launch failed");
                if let Err(stop_err) = self.remote.stop_stream(camera.id) {
                    tracing::warn!(
                        camera_id = camera.id,
                        error = %stop_err,
                        "Compensating remote stop failed"
                    );
                }
                self.ports.release(port);
                Err(e)
            }
        }
    }

    /// Build output paths and the pipeline descriptor, then spawn and
    /// health-check the recorder.
    fn launch_recorder(
        &self,
        camera: &Camera,
        capability: &Capability,
        output_dir: &Path,
        options: &StartOptions,
        port: u16,
    ) -> Result<Session> {
        std::fs::create_dir_all(output_dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let base_name = format!("{}_{}_{}", camera.id, camera.sanitized_name(), timestamp);
        let output_path = output_dir.join(format!("{}-%02d.mkv", base_name));

        let log = match options.log {
            RecorderLog::File => LogDestination::File(output_dir.join(format!("{}.log", base_name))),
            RecorderLog::Console => LogDestination::Inherit,
            RecorderLog::Null => LogDestination::Null,
        };

        let mut spec = PipelineSpec::new(self.remote.stream_host(), port, output_path.clone());
        spec.max_files = options.max_files;
        spec.max_size_time = options.max_size_time;
        spec.max_size_bytes = options.max_size_bytes;
        let pipeline = spec.command();

        let process = self.recorder.spawn(&pipeline, &log)?;

        Ok(Session {
            camera: camera.clone(),
            capability: capability.clone(),
            port,
            output_path,
            pipeline,
            log_path: log.path().cloned(),
            process,
            started_at: Utc::now(),
        })
    }

    /// Stop the session registered for `camera_id`.
    ///
    /// Stopping a camera without a session is a no-op, not a failure. A
    /// remote stop rejection after the local teardown is reported as
    /// [`StopOutcome::StoppedLocally`], never as an error: the local
    /// resources are already released.
    pub fn stop(&mut self, camera_id: u32) -> Result<StopOutcome> {
        // Removing first means a second stop for the same camera cannot
        // double-process the session.
        let Some(mut session) = self.sessions.remove(&camera_id) else {
            tracing::info!(camera_id, "No active session for camera");
            return Ok(StopOutcome::NotActive);
        };

        if let Err(e) = self.recorder.terminate(&mut session.process) {
            tracing::warn!(camera_id, error = %e, "Recorder termination reported an error");
        }
        self.ports.release(session.port);

        match self.remote.stop_stream(camera_id) {
            Ok(()) => {
                tracing::info!(camera_id, "Session stopped");
                Ok(StopOutcome::Stopped {
                    output_path: session.output_path,
                })
            }
            Err(e) => {
                tracing::warn!(camera_id, error = %e, "Remote stop failed after local cleanup");
                Ok(StopOutcome::StoppedLocally {
                    output_path: session.output_path,
                    remote_error: e.to_string(),
                })
            }
        }
    }

    /// Stop every registered session, swallowing per-camera failures so one
    /// camera cannot block the others.
    ///
    /// Guarded: calls after the first are no-ops. [`Drop`] runs this too, so
    /// holding a manager in a scope guarantees cleanup on all exit paths.
    pub fn cleanup_all(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        let camera_ids: Vec<u32> = self.sessions.keys().copied().collect();
        tracing::info!(count = camera_ids.len(), "Cleaning up all sessions");
        for camera_id in camera_ids {
            if let Err(e) = self.stop(camera_id) {
                tracing::warn!(camera_id, error = %e, "Cleanup failed for camera");
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}
