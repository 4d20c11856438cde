//! FollowCam turns a landscape gameplay recording into a vertical (9:16)
//! video that follows one sprite horizontally.
//!
//! Each frame is reduced to a small luma plane and searched with ZNCC against
//! a library of reference appearances. The best confident match drives an
//! exponentially smoothed virtual camera, and a full-height crop around the
//! camera is resized to the output resolution. Operators can re-center the
//! camera or teach new appearances mid-run through a small calibration state
//! machine.
//!
//! Video I/O goes through `ffmpeg`/`ffprobe` child processes ([`video`]);
//! everything else is pure and testable with in-memory frames. Enable the
//! `rayon` feature to scan templates row-parallel and `tracing` for
//! structured diagnostics.

pub mod calibration;
pub mod camera;
mod candidate;
pub mod image;
pub mod kernel;
pub mod library;
pub mod pipeline;
pub mod search;
pub mod template;
mod trace;
pub mod util;
pub mod video;

pub use calibration::{
    CalibrationController, CalibrationEvent, CalibrationState, OperatorCommand, Region,
    RegionSelector, SelectionPrompt,
};
pub use camera::{AspectRatio, CameraSmoother, CameraState, CropGeometry, CropWindow};
pub use candidate::topk::{Peak, TopK};
pub use image::{ImageView, OwnedImage};
pub use kernel::{Kernel, ScanParams};
pub use library::{LoadReport, ReferenceLibrary, SkippedFile};
pub use pipeline::{
    CommandSource, FrameReport, FrameSink, FrameSource, NoCommands, Preview, Session, SessionIo,
    SessionObserver, SessionSummary, Tracker, TrackerConfig,
};
pub use search::{to_full_res, MatchConfig, MatchResult, Matcher};
pub use template::{Template, TemplatePlan};
pub use util::{FollowCamError, FollowCamResult};
pub use video::{EncoderSettings, FfmpegSink, FfmpegSource, VideoInfo};
