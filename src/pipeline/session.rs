//! The frame loop and the collaborators it drives.

use crate::calibration::{CalibrationController, CalibrationEvent, OperatorCommand, RegionSelector};
use crate::camera::CropGeometry;
use crate::library::ReferenceLibrary;
use crate::pipeline::overlay::draw_status;
use crate::pipeline::{FrameReport, Tracker, TrackerConfig};
use crate::trace::{trace_span, trace_warn};
use crate::util::{FollowCamError, FollowCamResult};
use crate::video::VideoInfo;
use ::image::RgbImage;

/// Produces full-resolution frames in presentation order.
pub trait FrameSource {
    /// Stream geometry and timing.
    fn info(&self) -> VideoInfo;
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> FollowCamResult<Option<RgbImage>>;
}

/// Consumes output frames.
pub trait FrameSink {
    /// Appends one output frame.
    fn write_frame(&mut self, frame: &RgbImage) -> FollowCamResult<()>;
    /// Flushes and closes the output. Called exactly once per run.
    fn finish(&mut self) -> FollowCamResult<()>;
}

/// Non-blocking source of operator commands.
pub trait CommandSource {
    /// Returns a pending command without waiting.
    fn poll(&mut self) -> Option<OperatorCommand>;
}

/// Displays annotated output frames.
pub trait Preview {
    /// Shows `frame`, which already carries the status overlay.
    fn show(&mut self, frame: &RgbImage) -> FollowCamResult<()>;
}

/// Receives session progress; every method defaults to doing nothing.
pub trait SessionObserver {
    /// A calibration step completed.
    fn on_calibration(&mut self, _event: &CalibrationEvent) {}
    /// A frame was tracked and written.
    fn on_frame(&mut self, _index: u64, _report: &FrameReport) {}
    /// `processed` frames are done out of `total` when known.
    fn on_progress(&mut self, _processed: u64, _total: Option<u64>) {}
}

impl SessionObserver for () {}

/// Commands that never arrive, for unattended runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn poll(&mut self) -> Option<OperatorCommand> {
        None
    }
}

/// Collaborators for one [`Session::run`].
pub struct SessionIo<'a> {
    pub source: &'a mut dyn FrameSource,
    pub sink: &'a mut dyn FrameSink,
    pub commands: &'a mut dyn CommandSource,
    pub selector: &'a mut dyn RegionSelector,
    pub preview: Option<&'a mut dyn Preview>,
    pub observer: &'a mut dyn SessionObserver,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames written to the sink.
    pub frames: u64,
    /// Frames where the subject was not detected.
    pub lost_frames: u64,
    /// The operator quit before the end of the stream.
    pub quit: bool,
    /// Library size at the end of the run.
    pub templates: usize,
}

/// Owns the library and configuration for one tracking run.
#[derive(Debug)]
pub struct Session {
    config: TrackerConfig,
    library: ReferenceLibrary,
    calibration: CalibrationController,
}

impl Session {
    /// Validates `config` and checks that `library` was built at its scale.
    pub fn new(config: TrackerConfig, library: ReferenceLibrary) -> FollowCamResult<Self> {
        config.validate()?;
        if (library.scale() - config.scale).abs() > f32::EPSILON {
            return Err(FollowCamError::InvalidConfig(
                "library scale differs from configured scale",
            ));
        }
        Ok(Self {
            config,
            library,
            calibration: CalibrationController::new(),
        })
    }

    /// Reference library, including templates added during the run.
    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    /// Run configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Processes the whole stream.
    ///
    /// The sink is finished on every exit path; when both the loop and the
    /// finish fail, the loop error is returned.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn run(&mut self, mut io: SessionIo<'_>) -> FollowCamResult<SessionSummary> {
        let _span = trace_span!("session").entered();
        let outcome = self.drive(&mut io);
        let finished = io.sink.finish();
        match (outcome, finished) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(finish_err)) => {
                trace_warn!(%finish_err, "sink finish failed after error");
                Err(err)
            }
        }
    }

    fn drive(&mut self, io: &mut SessionIo<'_>) -> FollowCamResult<SessionSummary> {
        let info = io.source.info();
        let geometry = CropGeometry::new(info.width, info.height, self.config.aspect)?;

        let mut frame = io
            .source
            .next_frame()?
            .ok_or_else(|| FollowCamError::SourceUnreadable {
                reason: "stream has no frames".to_string(),
            })?;

        let (camera, event) =
            self.calibration
                .initialize(&frame, &mut self.library, &mut *io.selector);
        io.observer.on_calibration(&event);

        let mut tracker = Tracker::new(&self.config, geometry, camera)?;
        let mut summary = SessionSummary::default();

        loop {
            if frame.dimensions() != (info.width, info.height) {
                return Err(FollowCamError::SourceUnreadable {
                    reason: format!(
                        "frame {} is {}x{}, expected {}x{}",
                        summary.frames,
                        frame.width(),
                        frame.height(),
                        info.width,
                        info.height
                    ),
                });
            }

            let index = summary.frames;
            let report = tracker.process_frame(&frame, &self.library)?;
            let output = tracker.render(&frame, report.window);
            io.sink.write_frame(&output)?;
            summary.frames += 1;
            if report.lost {
                summary.lost_frames += 1;
            }
            io.observer.on_frame(index, &report);

            let every = self.config.preview_every;
            if let Some(preview) = io.preview.as_deref_mut() {
                if every > 0 && index % every == 0 {
                    let mut annotated = output;
                    draw_status(&mut annotated, report.lost);
                    preview.show(&annotated)?;
                }
            }

            match io.commands.poll() {
                Some(OperatorCommand::Quit) => {
                    summary.quit = true;
                    break;
                }
                Some(command) => {
                    if let Some(event) = self.calibration.handle(
                        command,
                        &frame,
                        &mut self.library,
                        tracker.camera_mut(),
                        &mut *io.selector,
                    ) {
                        io.observer.on_calibration(&event);
                    }
                }
                None => {}
            }

            let every = self.config.progress_every;
            if every > 0 && summary.frames % every == 0 {
                io.observer.on_progress(summary.frames, info.frames);
            }

            match io.source.next_frame()? {
                Some(next) => frame = next,
                None => break,
            }
        }

        summary.templates = self.library.len();
        io.observer.on_progress(summary.frames, info.frames);
        Ok(summary)
    }
}
