//! Per-frame tracking step: match, gate, smooth, crop.

use crate::camera::{render_crop, CameraSmoother, CameraState, CropGeometry, CropWindow};
use crate::library::ReferenceLibrary;
use crate::pipeline::TrackerConfig;
use crate::search::{MatchResult, Matcher};
use crate::trace::trace_event;
use crate::util::FollowCamResult;
use ::image::RgbImage;

/// What happened to one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    /// Best match regardless of the threshold, if any template fit.
    pub matched: Option<MatchResult>,
    /// Full-resolution target the camera moved toward.
    pub target: Option<f64>,
    /// No match at or above the threshold.
    pub lost: bool,
    /// Camera after smoothing.
    pub camera: CameraState,
    /// Crop window derived from `camera`.
    pub window: CropWindow,
}

impl FrameReport {
    /// Score of the best match, if one was found.
    pub fn score(&self) -> Option<f32> {
        self.matched.map(|m| m.score)
    }
}

/// Matcher, smoother, and crop geometry bound to one source size.
#[derive(Clone, Debug)]
pub struct Tracker {
    matcher: Matcher,
    smoother: CameraSmoother,
    geometry: CropGeometry,
    threshold: f32,
    output: (u32, u32),
    camera: CameraState,
}

impl Tracker {
    /// Builds a tracker for frames described by `geometry`, starting at `camera`.
    pub fn new(
        cfg: &TrackerConfig,
        geometry: CropGeometry,
        camera: CameraState,
    ) -> FollowCamResult<Self> {
        cfg.validate()?;
        Ok(Self {
            matcher: Matcher::new().with_config(cfg.matcher.clone()),
            smoother: CameraSmoother::new(cfg.smoothing)?,
            geometry,
            threshold: cfg.match_threshold,
            output: (cfg.output_width, cfg.output_height),
            camera,
        })
    }

    /// Current camera.
    pub fn camera(&self) -> CameraState {
        self.camera
    }

    /// Mutable camera, for calibration overrides.
    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    /// Crop geometry of the run.
    pub fn geometry(&self) -> &CropGeometry {
        &self.geometry
    }

    /// Matches `frame` against `library` and advances the camera.
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        library: &ReferenceLibrary,
    ) -> FollowCamResult<FrameReport> {
        let scale = library.scale();
        let matched = if library.is_empty() {
            None
        } else {
            let reduced = self.matcher.reduce_frame(frame, scale)?;
            self.matcher.best_match(reduced.view(), library)?
        };

        let target = matched
            .filter(|m| m.score >= self.threshold)
            .map(|m| m.full_res_center_x(scale));
        self.camera = self.smoother.step(self.camera, target);
        let window = self.geometry.window(self.camera);

        trace_event!(
            "frame",
            lost = target.is_none(),
            camera_x = self.camera.x,
            crop_x = window.x
        );

        Ok(FrameReport {
            matched,
            target,
            lost: target.is_none(),
            camera: self.camera,
            window,
        })
    }

    /// Cuts and resizes the output frame for a processed frame.
    pub fn render(&self, frame: &RgbImage, window: CropWindow) -> RgbImage {
        render_crop(frame, window, self.output.0, self.output.1)
    }
}

#[cfg(test)]
mod tests {
    use super::Tracker;
    use crate::camera::{AspectRatio, CameraState, CropGeometry};
    use crate::library::ReferenceLibrary;
    use crate::pipeline::TrackerConfig;
    use ::image::{imageops, Rgb, RgbImage};

    fn sprite() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| {
            let v = ((x * 7 + y * 3 + (x * y) % 11) * 5 % 256) as u8;
            Rgb([v, 255 - v, (x * 4) as u8])
        })
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            output_width: 90,
            output_height: 160,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn empty_library_holds_camera() {
        let cfg = config();
        let geometry = CropGeometry::new(640, 360, AspectRatio::default()).unwrap();
        let mut tracker = Tracker::new(&cfg, geometry, CameraState::at(500.0)).unwrap();
        let library = ReferenceLibrary::new(cfg.scale).unwrap();
        let frame = RgbImage::new(640, 360);
        for _ in 0..10 {
            let report = tracker.process_frame(&frame, &library).unwrap();
            assert!(report.lost);
            assert_eq!(report.camera.x, 500.0);
        }
    }

    #[test]
    fn detection_pulls_camera_toward_sprite() {
        let cfg = config();
        let mut frame = RgbImage::from_pixel(640, 360, Rgb([20, 20, 20]));
        imageops::replace(&mut frame, &sprite(), 400, 120);
        let mut library = ReferenceLibrary::new(cfg.scale).unwrap();
        library.add(sprite()).unwrap();

        let geometry = CropGeometry::new(640, 360, AspectRatio::default()).unwrap();
        let mut tracker = Tracker::new(&cfg, geometry, CameraState::at(320.0)).unwrap();
        let report = tracker.process_frame(&frame, &library).unwrap();

        assert!(!report.lost);
        assert_eq!(report.target, Some(432.0));
        assert!((report.camera.x - (320.0 + 112.0 * 0.15)).abs() < 1e-9);
        let out = tracker.render(&frame, report.window);
        assert_eq!(out.dimensions(), (90, 160));
    }

    #[test]
    fn low_score_counts_as_lost() {
        let cfg = TrackerConfig {
            match_threshold: 1.0,
            ..config()
        };
        let mut frame = RgbImage::from_fn(640, 360, |x, y| {
            Rgb([((x * 31 + y * 17) % 256) as u8, 0, 0])
        });
        let mut library = ReferenceLibrary::new(cfg.scale).unwrap();
        library.add(sprite()).unwrap();
        imageops::invert(&mut frame);

        let geometry = CropGeometry::new(640, 360, AspectRatio::default()).unwrap();
        let mut tracker = Tracker::new(&cfg, geometry, CameraState::at(200.0)).unwrap();
        let report = tracker.process_frame(&frame, &library).unwrap();
        assert!(report.matched.is_some());
        assert!(report.lost);
        assert_eq!(report.camera.x, 200.0);
    }
}
