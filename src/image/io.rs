//! Conversions between `image` crate buffers and matcher views.

use crate::image::OwnedImage;
use crate::util::{FollowCamError, FollowCamResult};
use ::image::RgbImage;
use std::path::Path;

/// Converts an RGB image to an owned luma plane (BT.601 weights, rounded).
pub fn luma(img: &RgbImage) -> FollowCamResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            let y = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
            ((y + 500) / 1000) as u8
        })
        .collect();
    OwnedImage::new(data, width, height)
}

/// Loads an image from disk and converts it to RGB8.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> FollowCamResult<RgbImage> {
    let path = path.as_ref();
    let img = ::image::open(path).map_err(|err| FollowCamError::TemplateDecode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(img.to_rgb8())
}
