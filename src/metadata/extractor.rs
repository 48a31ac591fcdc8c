//! ffprobe-based frame metadata extraction
//!
//! Demuxes a recorded container through ffprobe and parses the fixed-layout
//! metadata the camera hardware embeds in each JPEG packet.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Packets shorter than this carry no embedded metadata
const MIN_PACKET_LEN: usize = 46;
/// Byte offset of the metadata block inside a packet
const METADATA_OFFSET: usize = 6;
/// Size of the metadata block in bytes
const METADATA_LEN: usize = 40;

// Little-endian field offsets inside the metadata block.
const PIPELINE_PTS_OFFSET: usize = 0;
const DEVICE_TIMESTAMP_OFFSET: usize = 8;
const SAMPLE_INDEX_OFFSET: usize = 16;
const TTL_IN_OFFSET: usize = 20;
const TTL_OUT_OFFSET: usize = 24;
// 28..32 is a transfer performance counter, 32..40 reserved padding; neither
// is part of the record.

/// Metadata of a single recorded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameMetadata {
    /// Presentation timestamp of the frame from the container
    pub frame_pts: i64,

    /// Timestamp assigned by the streaming pipeline on the server
    pub pipeline_pts: u64,

    /// Timestamp from the acquisition hardware
    pub device_timestamp: u64,

    /// Sample index from the acquisition system
    pub sample_index: u32,

    /// State of the TTL input lines
    pub ttl_in: u32,

    /// State of the TTL output lines
    pub ttl_out: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    packets: Vec<ProbePacket>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbePacket {
    #[serde(default)]
    pts: Option<i64>,
    /// ffprobe reports packet sizes as strings
    #[serde(default)]
    size: Option<String>,
    /// Hex dump of the packet payload, from `-show_data`
    #[serde(default)]
    data: Option<String>,
}

/// Extract the embedded per-frame metadata from a recorded video file.
///
/// The records come back in demux order, one per packet that carries
/// metadata. A file that exists but cannot be demuxed, has no video stream,
/// or holds no qualifying packets yields an empty vector, not an error;
/// only a missing file fails. Re-running on the same path gives identical
/// results.
pub fn extract_metadata(path: &Path) -> Result<Vec<FrameMetadata>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    // ffprobe does the demuxing; packets of the first video stream come
    // back as JSON with their payload hex-dumped.
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_streams",
            "-show_packets",
            "-show_data",
            "-print_format",
            "json",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        tracing::warn!(
            path = %path.display(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ffprobe could not parse file"
        );
        return Ok(Vec::new());
    }

    let probe: ProbeOutput = match serde_json::from_slice(&output.stdout) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable ffprobe output");
            return Ok(Vec::new());
        }
    };

    Ok(collect_records(&probe, path))
}

/// One forward pass over the demuxed packets
fn collect_records(probe: &ProbeOutput, path: &Path) -> Vec<FrameMetadata> {
    let has_video = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("video"));
    if !has_video {
        tracing::warn!(path = %path.display(), "No video stream found in file");
        return Vec::new();
    }

    let mut records = Vec::new();
    for packet in &probe.packets {
        let Some(pts) = packet.pts else {
            tracing::warn!(path = %path.display(), "Packet has no PTS, skipping");
            continue;
        };
        let Some(dump) = packet.data.as_deref() else {
            continue;
        };
        let expected = packet
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(usize::MAX);
        let payload = decode_hex_dump(dump, expected);
        if let Some(record) = parse_packet_metadata(&payload, pts) {
            records.push(record);
        }
    }
    records
}

/// Parse the embedded metadata of one packet, if present.
///
/// The layout is a bit-exact hardware format: 6 bytes of JPEG header, then
/// a 40-byte little-endian block (see the field offsets above). Undersized
/// packets simply carry no metadata.
fn parse_packet_metadata(payload: &[u8], frame_pts: i64) -> Option<FrameMetadata> {
    if payload.len() < MIN_PACKET_LEN {
        return None;
    }
    let block = &payload[METADATA_OFFSET..METADATA_OFFSET + METADATA_LEN];
    Some(FrameMetadata {
        frame_pts,
        pipeline_pts: read_u64(block, PIPELINE_PTS_OFFSET),
        device_timestamp: read_u64(block, DEVICE_TIMESTAMP_OFFSET),
        sample_index: read_u32(block, SAMPLE_INDEX_OFFSET),
        ttl_in: read_u32(block, TTL_IN_OFFSET),
        ttl_out: read_u32(block, TTL_OUT_OFFSET),
    })
}

fn read_u64(block: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&block[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn read_u32(block: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&block[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// Decode ffprobe's hex dump back into bytes.
///
/// Each line is `<offset>: <up to 8 groups of 4 hex digits>  <ascii>`; the
/// ASCII column is skipped by construction and `expected` caps the output
/// at the packet size ffprobe reported.
fn decode_hex_dump(dump: &str, expected: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(expected.min(64 * 1024));
    for line in dump.lines() {
        let Some((_offset, rest)) = line.split_once(':') else {
            continue;
        };
        for group in rest.split_whitespace() {
            if bytes.len() >= expected {
                return bytes;
            }
            let is_hex_group = group.len() <= 4
                && group.len() % 2 == 0
                && group.bytes().all(|b| b.is_ascii_hexdigit());
            if !is_hex_group {
                // Start of the ASCII column
                break;
            }
            let mut i = 0;
            while i < group.len() && bytes.len() < expected {
                if let Ok(byte) = u8::from_str_radix(&group[i..i + 2], 16) {
                    bytes.push(byte);
                }
                i += 2;
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Render bytes the way ffprobe's -show_data does
    fn hex_dump(data: &[u8]) -> String {
        let mut out = String::new();
        for (i, chunk) in data.chunks(16).enumerate() {
            out.push_str(&format!("\n{:08x}: ", i * 16));
            for pair in chunk.chunks(2) {
                for b in pair {
                    out.push_str(&format!("{:02x}", b));
                }
                out.push(' ');
            }
            out.push(' ');
            for b in chunk {
                out.push(if b.is_ascii_graphic() { *b as char } else { '.' });
            }
        }
        out
    }

    /// A packet of exactly MIN_PACKET_LEN bytes with known metadata fields
    fn packet_with_metadata(
        pipeline_pts: u64,
        device_timestamp: u64,
        sample_index: u32,
        ttl_in: u32,
        ttl_out: u32,
    ) -> Vec<u8> {
        let mut data = vec![0xFFu8; METADATA_OFFSET];
        data.extend_from_slice(&pipeline_pts.to_le_bytes());
        data.extend_from_slice(&device_timestamp.to_le_bytes());
        data.extend_from_slice(&sample_index.to_le_bytes());
        data.extend_from_slice(&ttl_in.to_le_bytes());
        data.extend_from_slice(&ttl_out.to_le_bytes());
        data.extend_from_slice(&0x1234_5678u32.to_le_bytes()); // perf counter
        data.extend_from_slice(&[0u8; 8]); // reserved
        assert_eq!(data.len(), MIN_PACKET_LEN);
        data
    }

    fn video_probe(packets: Vec<ProbePacket>) -> ProbeOutput {
        ProbeOutput {
            streams: vec![ProbeStream {
                codec_type: Some("video".to_string()),
            }],
            packets,
        }
    }

    fn packet(pts: Option<i64>, payload: &[u8]) -> ProbePacket {
        ProbePacket {
            pts,
            size: Some(payload.len().to_string()),
            data: Some(hex_dump(payload)),
        }
    }

    #[test]
    fn test_hex_dump_round_trip() {
        let payload: Vec<u8> = (0..100).collect();
        let decoded = decode_hex_dump(&hex_dump(&payload), payload.len());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_hex_dump_size_cap_beats_hexlike_ascii() {
        // Final line has two bytes whose ASCII column ("ab") looks like hex.
        let dump = "\n00000000: 6162  ab";
        assert_eq!(decode_hex_dump(dump, 2), vec![0x61, 0x62]);
    }

    #[test]
    fn test_parse_little_endian_fields() {
        let payload = packet_with_metadata(0x0102_0304_0506_0708, 42, 7, 0b1010, 0b0101);
        let record = parse_packet_metadata(&payload, 900).unwrap();
        assert_eq!(record.frame_pts, 900);
        assert_eq!(record.pipeline_pts, 0x0102_0304_0506_0708);
        assert_eq!(record.device_timestamp, 42);
        assert_eq!(record.sample_index, 7);
        assert_eq!(record.ttl_in, 0b1010);
        assert_eq!(record.ttl_out, 0b0101);
    }

    #[test]
    fn test_packet_length_boundary() {
        let payload = packet_with_metadata(1, 2, 3, 4, 5);
        assert!(parse_packet_metadata(&payload, 0).is_some());
        assert!(parse_packet_metadata(&payload[..MIN_PACKET_LEN - 1], 0).is_none());
    }

    #[test]
    fn test_undersized_packets_are_skipped_in_order() {
        // Sizes 50, 10, 46, 5, 100: only the 50-, 46- and 100-byte packets
        // carry metadata.
        let sizes = [50usize, 10, 46, 5, 100];
        let packets = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let mut payload = packet_with_metadata(i as u64, 0, 0, 0, 0);
                payload.resize(size, 0);
                packet(Some(i as i64 * 10), &payload)
            })
            .collect();

        let records = collect_records(&video_probe(packets), Path::new("test.mkv"));
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.frame_pts).collect::<Vec<_>>(),
            vec![0, 20, 40]
        );
        assert_eq!(
            records.iter().map(|r| r.pipeline_pts).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
    }

    #[test]
    fn test_packet_without_pts_is_skipped() {
        let payload = packet_with_metadata(1, 2, 3, 4, 5);
        let packets = vec![packet(None, &payload), packet(Some(7), &payload)];
        let records = collect_records(&video_probe(packets), Path::new("test.mkv"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].frame_pts, 7);
    }

    #[test]
    fn test_no_video_stream_yields_empty() {
        let probe = ProbeOutput {
            streams: vec![ProbeStream {
                codec_type: Some("audio".to_string()),
            }],
            packets: vec![packet(Some(0), &packet_with_metadata(1, 2, 3, 4, 5))],
        };
        assert!(collect_records(&probe, Path::new("test.mkv")).is_empty());
    }

    #[test]
    fn test_probe_json_shape() {
        let json = r#"{
            "packets": [
                {"codec_type": "video", "pts": 33, "size": "4", "data": "\n00000000: 0102 0304  ...."}
            ],
            "streams": [{"index": 0, "codec_type": "video"}]
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.packets[0].pts, Some(33));
        let payload = decode_hex_dump(probe.packets[0].data.as_deref().unwrap(), 4);
        assert_eq!(payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = PathBuf::from("/nonexistent/recording-00.mkv");
        match extract_metadata(&path) {
            Err(Error::NotFound(reported)) => assert_eq!(reported, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
