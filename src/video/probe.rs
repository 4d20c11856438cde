//! Stream metadata via `ffprobe`.

use crate::util::{FollowCamError, FollowCamResult};
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};

/// Geometry and timing of a video stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    /// Frame count when the container reports or implies one.
    pub frames: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Runs `ffprobe` on `path` and parses the first video stream.
pub fn probe_video(path: &Path) -> FollowCamResult<VideoInfo> {
    if !path.is_file() {
        return Err(FollowCamError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| super::spawn_error("ffprobe", e))?;

    if !output.status.success() {
        return Err(FollowCamError::SourceUnreadable {
            reason: format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    parse_probe_json(&output.stdout)
}

/// Parses `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(json: &[u8]) -> FollowCamResult<VideoInfo> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| FollowCamError::SourceUnreadable {
            reason: format!("invalid ffprobe output: {e}"),
        })?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| FollowCamError::SourceUnreadable {
            reason: "no video stream".to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(FollowCamError::SourceUnreadable {
                reason: "video stream has no frame size".to_string(),
            })
        }
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    let frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .or_else(|| {
            let duration = stream
                .duration
                .as_deref()
                .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))?
                .parse::<f64>()
                .ok()?;
            (duration > 0.0).then(|| (duration * fps).round() as u64)
        });

    Ok(VideoInfo {
        width,
        height,
        fps,
        frames,
    })
}

/// Parses `"30000/1001"` or `"29.97"`; zero and malformed rates yield `None`.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
