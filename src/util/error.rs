//! Error types for followcam.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for followcam operations.
pub type FollowCamResult<T> = std::result::Result<T, FollowCamError>;

/// Errors that can occur while loading references, matching, or streaming video.
#[derive(Debug, Error)]
pub enum FollowCamError {
    /// The input video path does not resolve to a file.
    #[error("source video not found: {}", path.display())]
    SourceNotFound { path: PathBuf },
    /// The video opened but could not be probed or yielded no frames.
    #[error("source video unreadable: {reason}")]
    SourceUnreadable { reason: String },
    /// A reference image could not be decoded.
    #[error("failed to decode template {}: {reason}", path.display())]
    TemplateDecode { path: PathBuf, reason: String },
    /// A template cannot be correlated (empty or constant patch).
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// The target-aspect crop is wider than the source frame.
    #[error("crop width {crop_width} exceeds source frame width {frame_width}")]
    CropWidthExceedsSource { crop_width: u32, frame_width: u32 },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The buffer is smaller than the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// A region of interest falls outside the image.
    #[error(
        "roi out of bounds: ({x}, {y}) {width}x{height} in {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The ffmpeg/ffprobe bridge failed.
    #[error("ffmpeg: {reason}")]
    Ffmpeg { reason: String },
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
