//! Operator-driven calibration of the camera and the reference library.
//!
//! The controller is a small state machine around a modal selection
//! primitive. It always returns to [`CalibrationState::Tracking`]; every
//! outcome, including ignored selections, is returned as a
//! [`CalibrationEvent`] for the caller to report.

mod region;

pub use region::Region;

use crate::camera::CameraState;
use crate::library::ReferenceLibrary;
use crate::trace::trace_warn;
use ::image::imageops;
use ::image::RgbImage;

/// Controller states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationState {
    /// Automatic tracking loop running.
    Tracking,
    /// No templates yet; waiting for the operator to draw the subject.
    SelectingInitial,
    /// Operator is redefining the camera center.
    Recalibrating,
    /// Operator is redefining the camera center and adding a template.
    AddingTemplate,
}

/// Commands issued by the operator between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Stop processing and finalize the output.
    Quit,
    /// Re-center the camera on a drawn region.
    Recalibrate,
    /// Re-center the camera and add the drawn region as a template.
    AddTemplate,
}

/// What a selection prompt is for; lets a selector title its window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionPrompt {
    Initial,
    Recalibrate,
    AddTemplate,
}

/// Modal "draw a rectangle on this frame" capability.
pub trait RegionSelector {
    /// Blocks until the operator draws a region or cancels (`None`).
    fn request_region(&mut self, frame: &RgbImage, prompt: SelectionPrompt) -> Option<Region>;
}

/// Outcome of a calibration step.
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationEvent {
    /// The library already had templates; nothing was asked.
    LibraryReady { templates: usize },
    /// The initial selection produced the first template.
    InitialTemplate { region: Region, camera_x: f64 },
    /// Camera re-centered without touching the library.
    Recentered { region: Region, camera_x: f64 },
    /// Camera re-centered and a template appended.
    TemplateAdded {
        region: Region,
        camera_x: f64,
        templates: usize,
    },
    /// Camera re-centered but the region could not become a template.
    TemplateRejected {
        region: Region,
        camera_x: f64,
        reason: String,
    },
    /// The selection was empty or cancelled; prior state kept.
    SelectionIgnored { prompt: SelectionPrompt },
}

/// State machine driving initial selection, recalibration, and additions.
#[derive(Debug)]
pub struct CalibrationController {
    state: CalibrationState,
}

impl Default for CalibrationController {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationController {
    /// Starts in `Tracking`.
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Tracking,
        }
    }

    /// Current state (always `Tracking` between calls).
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Decides the starting camera for the first frame.
    ///
    /// With an empty library the operator is asked for the subject; a valid
    /// region seeds the library and centers the camera on it.
    pub fn initialize<S: RegionSelector + ?Sized>(
        &mut self,
        frame: &RgbImage,
        library: &mut ReferenceLibrary,
        selector: &mut S,
    ) -> (CameraState, CalibrationEvent) {
        let midpoint = CameraState::centered(frame.width());
        if !library.is_empty() {
            return (
                midpoint,
                CalibrationEvent::LibraryReady {
                    templates: library.len(),
                },
            );
        }

        self.state = CalibrationState::SelectingInitial;
        let outcome = match self.select(frame, selector, SelectionPrompt::Initial) {
            None => (
                midpoint,
                CalibrationEvent::SelectionIgnored {
                    prompt: SelectionPrompt::Initial,
                },
            ),
            Some(region) => {
                let camera = CameraState::at(region.center_x());
                match library.add(patch(frame, region)) {
                    Ok(_) => (
                        camera,
                        CalibrationEvent::InitialTemplate {
                            region,
                            camera_x: camera.x,
                        },
                    ),
                    Err(err) => {
                        trace_warn!(%err, "initial selection rejected as template");
                        (
                            camera,
                            CalibrationEvent::TemplateRejected {
                                region,
                                camera_x: camera.x,
                                reason: err.to_string(),
                            },
                        )
                    }
                }
            }
        };
        self.state = CalibrationState::Tracking;
        outcome
    }

    /// Handles a recalibration or add command against the current frame.
    ///
    /// `Quit` is not a calibration command and leaves everything unchanged.
    pub fn handle<S: RegionSelector + ?Sized>(
        &mut self,
        command: OperatorCommand,
        frame: &RgbImage,
        library: &mut ReferenceLibrary,
        camera: &mut CameraState,
        selector: &mut S,
    ) -> Option<CalibrationEvent> {
        let (state, prompt) = match command {
            OperatorCommand::Quit => return None,
            OperatorCommand::Recalibrate => {
                (CalibrationState::Recalibrating, SelectionPrompt::Recalibrate)
            }
            OperatorCommand::AddTemplate => {
                (CalibrationState::AddingTemplate, SelectionPrompt::AddTemplate)
            }
        };

        self.state = state;
        let event = match self.select(frame, selector, prompt) {
            None => CalibrationEvent::SelectionIgnored { prompt },
            Some(region) => {
                *camera = CameraState::at(region.center_x());
                if state == CalibrationState::Recalibrating {
                    CalibrationEvent::Recentered {
                        region,
                        camera_x: camera.x,
                    }
                } else {
                    match library.add(patch(frame, region)) {
                        Ok(_) => CalibrationEvent::TemplateAdded {
                            region,
                            camera_x: camera.x,
                            templates: library.len(),
                        },
                        Err(err) => {
                            trace_warn!(%err, "selected region rejected as template");
                            CalibrationEvent::TemplateRejected {
                                region,
                                camera_x: camera.x,
                                reason: err.to_string(),
                            }
                        }
                    }
                }
            }
        };
        self.state = CalibrationState::Tracking;
        Some(event)
    }

    fn select<S: RegionSelector + ?Sized>(
        &self,
        frame: &RgbImage,
        selector: &mut S,
        prompt: SelectionPrompt,
    ) -> Option<Region> {
        selector
            .request_region(frame, prompt)
            .and_then(|region| region.clamp_to(frame.width(), frame.height()))
    }
}

/// Copies `region` out of the full-resolution frame.
fn patch(frame: &RgbImage, region: Region) -> RgbImage {
    imageops::crop_imm(frame, region.x, region.y, region.width, region.height).to_image()
}
