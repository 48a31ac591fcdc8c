//! Remote control-plane client
//!
//! HTTP+JSON client for the three stream operations the control plane
//! exposes: camera inventory, stream start, stream stop.

use crate::camera::Camera;
use crate::error::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Default control-plane host
pub const DEFAULT_HOST: &str = "192.168.177.100";
/// Default control-plane port
pub const DEFAULT_PORT: u16 = 8000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Control-plane operations the session manager depends on.
///
/// Implemented by [`RemoteClient`]; test code substitutes fakes.
pub trait ControlPlane {
    /// List the cameras the control plane knows about
    fn list_cameras(&self) -> Result<Vec<Camera>>;

    /// Start server-side streaming of `camera_id` to the given local port.
    /// `capability` is the canonical descriptor string.
    fn start_stream(&self, camera_id: u32, port: u16, capability: &str) -> Result<()>;

    /// Stop server-side streaming for `camera_id`
    fn stop_stream(&self, camera_id: u32) -> Result<()>;

    /// Host the camera stream is served from, used to build the recorder's
    /// stream URI.
    fn stream_host(&self) -> &str;
}

#[derive(Serialize)]
struct StartStreamRequest<'a> {
    id: u32,
    port: u16,
    capability: &'a str,
}

#[derive(Serialize)]
struct StopStreamRequest {
    id: u32,
}

/// Blocking HTTP client for the control plane.
///
/// Stateless beyond the base address; all session bookkeeping lives in the
/// session manager.
pub struct RemoteClient {
    host: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl RemoteClient {
    /// Build a client without probing the control plane
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            host: host.to_string(),
            base_url: format!("http://{}:{}", host, port),
            http,
        })
    }

    /// Build a client and verify the control plane is reachable.
    ///
    /// An unreachable control plane fails here, before any session state
    /// exists, with [`Error::Connectivity`].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let client = Self::new(host, port)?;
        let url = format!("{}/cameras", client.base_url);
        client.http.get(&url).send().map_err(|source| {
            tracing::error!(url = %url, error = %source, "Control plane unreachable");
            Error::Connectivity { url, source }
        })?;
        tracing::info!(base_url = %client.base_url, "Connected to control plane");
        Ok(client)
    }

    /// Base URL of the control plane, e.g. `http://192.168.177.100:8000`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check a response status, mapping rejections to [`Error::Remote`]
    /// with the response body attached.
    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::Remote(format!("{}: {}", status, body.trim())))
    }
}

impl ControlPlane for RemoteClient {
    fn list_cameras(&self) -> Result<Vec<Camera>> {
        let response = self.http.get(format!("{}/cameras", self.base_url)).send()?;
        let cameras: Vec<Camera> = Self::check(response)?.json()?;
        tracing::debug!(count = cameras.len(), "Listed cameras");
        Ok(cameras)
    }

    fn start_stream(&self, camera_id: u32, port: u16, capability: &str) -> Result<()> {
        let request = StartStreamRequest {
            id: camera_id,
            port,
            capability,
        };
        let response = self
            .http
            .post(format!("{}/jpeg", self.base_url))
            .json(&request)
            .send()?;
        Self::check(response)?;
        tracing::info!(camera_id, port, capability, "Started remote stream");
        Ok(())
    }

    fn stop_stream(&self, camera_id: u32) -> Result<()> {
        let request = StopStreamRequest { id: camera_id };
        let response = self
            .http
            .post(format!("{}/stop", self.base_url))
            .json(&request)
            .send()?;
        Self::check(response)?;
        tracing::info!(camera_id, "Stopped remote stream");
        Ok(())
    }

    fn stream_host(&self) -> &str {
        &self.host
    }
}
