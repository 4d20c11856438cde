//! Crop window derivation and rendering.
//!
//! The crop always spans the full source height; its width is the height
//! scaled by the target aspect ratio, so only the horizontal offset follows
//! the camera.

use crate::camera::CameraState;
use crate::util::{FollowCamError, FollowCamResult};
use ::image::imageops::{self, FilterType};
use ::image::RgbImage;

/// Target aspect ratio as `width : height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    /// Portrait 9:16.
    pub const PORTRAIT_9_16: AspectRatio = AspectRatio { num: 9, den: 16 };

    /// Width of a crop of the given height, rounded down.
    pub fn width_for_height(&self, height: u32) -> u32 {
        (u64::from(height) * u64::from(self.num) / u64::from(self.den)) as u32
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT_9_16
    }
}

/// Full-resolution crop rectangle (`y` is always 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

/// Frame and crop sizes fixed for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropGeometry {
    frame_width: u32,
    frame_height: u32,
    crop_width: u32,
}

impl CropGeometry {
    /// Validates that a crop of `aspect` fits a `frame_width x frame_height` source.
    pub fn new(frame_width: u32, frame_height: u32, aspect: AspectRatio) -> FollowCamResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(FollowCamError::InvalidDimensions {
                width: frame_width as usize,
                height: frame_height as usize,
            });
        }
        if aspect.num == 0 || aspect.den == 0 {
            return Err(FollowCamError::InvalidConfig("aspect ratio terms must be non-zero"));
        }
        let crop_width = aspect.width_for_height(frame_height);
        if crop_width == 0 {
            return Err(FollowCamError::InvalidConfig("crop width rounds to zero"));
        }
        if crop_width > frame_width {
            return Err(FollowCamError::CropWidthExceedsSource {
                crop_width,
                frame_width,
            });
        }
        Ok(Self {
            frame_width,
            frame_height,
            crop_width,
        })
    }

    /// Width of every crop window.
    pub fn crop_width(&self) -> u32 {
        self.crop_width
    }

    /// Source frame width.
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    /// Source frame height.
    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// Crop window centered on the camera, clamped inside the frame.
    pub fn window(&self, camera: CameraState) -> CropWindow {
        let half = f64::from(self.crop_width) / 2.0;
        let max_x = f64::from(self.frame_width - self.crop_width);
        let x = (camera.x - half).floor().max(0.0).min(max_x);
        CropWindow {
            x: x as u32,
            width: self.crop_width,
            height: self.frame_height,
        }
    }
}

/// Cuts `window` out of `frame` and resizes it to `out_width x out_height`
/// with nearest-neighbour sampling.
pub fn render_crop(
    frame: &RgbImage,
    window: CropWindow,
    out_width: u32,
    out_height: u32,
) -> RgbImage {
    let crop = imageops::crop_imm(frame, window.x, 0, window.width, window.height).to_image();
    if crop.dimensions() == (out_width, out_height) {
        return crop;
    }
    imageops::resize(&crop, out_width, out_height, FilterType::Nearest)
}
