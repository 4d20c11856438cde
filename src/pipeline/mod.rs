//! Per-frame tracking pipeline and the session loop around it.

mod config;
pub mod overlay;
mod session;
mod tracker;

pub use config::TrackerConfig;
pub use overlay::draw_status;
pub use session::{
    CommandSource, FrameSink, FrameSource, NoCommands, Preview, Session, SessionIo,
    SessionObserver, SessionSummary,
};
pub use tracker::{FrameReport, Tracker};
