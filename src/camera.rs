//! Camera and capability value objects
//!
//! Immutable descriptions of the cameras the control plane reports and the
//! stream formats they support.

use serde::{Deserialize, Serialize};

/// The only media type the recording pipeline can mux.
pub const MEDIA_TYPE_JPEG: &str = "image/jpeg";

/// One stream format a camera can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Media type, e.g. "image/jpeg" or "video/x-raw"
    pub media_type: String,

    /// Encoding sub-format, when the media type has one (e.g. "NV12")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Framerate as a rational, e.g. "30/1"
    pub framerate: String,
}

impl Capability {
    /// Whether this capability streams JPEG frames
    pub fn is_jpeg(&self) -> bool {
        self.media_type == MEDIA_TYPE_JPEG
    }

    /// Canonical descriptor string consumed by the control plane and the
    /// recording pipeline.
    ///
    /// The format segment is included only when the capability has one:
    /// `image/jpeg,width=1280,height=720,framerate=30/1` or
    /// `video/x-raw,format=NV12,width=1280,height=720,framerate=30/1`.
    pub fn descriptor(&self) -> String {
        match &self.format {
            Some(format) => format!(
                "{},format={},width={},height={},framerate={}",
                self.media_type, format, self.width, self.height, self.framerate
            ),
            None => format!(
                "{},width={},height={},framerate={}",
                self.media_type, self.width, self.height, self.framerate
            ),
        }
    }
}

/// A camera reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    /// Numeric camera ID, unique per control plane
    pub id: u32,

    /// Human-readable camera name
    pub name: String,

    /// Supported stream capabilities, in the order the camera reports them
    #[serde(default)]
    pub caps: Vec<Capability>,
}

impl Camera {
    /// Camera name with every non-alphanumeric character replaced by `_`,
    /// safe for use in file names.
    pub fn sanitized_name(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    /// The JPEG capabilities of this camera, in reported order
    pub fn jpeg_caps(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter().filter(|cap| cap.is_jpeg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_cap() -> Capability {
        Capability {
            media_type: MEDIA_TYPE_JPEG.to_string(),
            format: None,
            width: 1280,
            height: 720,
            framerate: "30/1".to_string(),
        }
    }

    #[test]
    fn test_descriptor_without_format() {
        assert_eq!(
            jpeg_cap().descriptor(),
            "image/jpeg,width=1280,height=720,framerate=30/1"
        );
    }

    #[test]
    fn test_descriptor_with_format() {
        let cap = Capability {
            media_type: "video/x-raw".to_string(),
            format: Some("NV12".to_string()),
            width: 640,
            height: 480,
            framerate: "15/1".to_string(),
        };
        assert_eq!(
            cap.descriptor(),
            "video/x-raw,format=NV12,width=640,height=480,framerate=15/1"
        );
    }

    #[test]
    fn test_sanitized_name() {
        let camera = Camera {
            id: 7,
            name: "Cam A (front)".to_string(),
            caps: vec![],
        };
        assert_eq!(camera.sanitized_name(), "Cam_A__front_");
    }

    #[test]
    fn test_jpeg_caps_filter() {
        let raw = Capability {
            media_type: "video/x-raw".to_string(),
            format: Some("YUY2".to_string()),
            ..jpeg_cap()
        };
        let camera = Camera {
            id: 0,
            name: "cam".to_string(),
            caps: vec![raw, jpeg_cap()],
        };
        let jpeg: Vec<_> = camera.jpeg_caps().collect();
        assert_eq!(jpeg.len(), 1);
        assert!(jpeg[0].is_jpeg());
    }

    #[test]
    fn test_deserialize_camera_list() {
        let json = r#"[
            {
                "id": 3,
                "name": "Top Camera",
                "caps": [
                    {"media_type": "image/jpeg", "width": 1920, "height": 1080, "framerate": "60/1"},
                    {"media_type": "video/x-raw", "format": "NV12", "width": 640, "height": 480, "framerate": "30/1"}
                ]
            },
            {"id": 4, "name": "Bare"}
        ]"#;
        let cameras: Vec<Camera> = serde_json::from_str(json).unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].caps.len(), 2);
        assert_eq!(cameras[0].caps[0].format, None);
        assert_eq!(cameras[0].caps[1].format.as_deref(), Some("NV12"));
        assert!(cameras[1].caps.is_empty());
    }
}
