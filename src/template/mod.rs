//! Reference templates held at two resolutions.

use crate::image::{downscale, luma, ImageView, OwnedImage};
use crate::util::{FollowCamError, FollowCamResult};
use ::image::RgbImage;

mod plan;

pub use plan::TemplatePlan;

/// One known appearance of the tracked subject.
///
/// The full-resolution patch is kept untouched; the reduced luma patch and its
/// correlation plan are derived once with the run's scale factor.
#[derive(Clone, Debug)]
pub struct Template {
    full: RgbImage,
    reduced: OwnedImage,
    plan: TemplatePlan,
}

impl Template {
    /// Builds a template from a full-resolution RGB patch.
    pub fn from_rgb(full: RgbImage, scale: f32) -> FollowCamResult<Self> {
        if full.width() == 0 || full.height() == 0 {
            return Err(FollowCamError::DegenerateTemplate {
                reason: "empty patch",
            });
        }
        let gray = luma(&full)?;
        let reduced = downscale(gray.view(), scale)?;
        let plan = TemplatePlan::from_view(reduced.view())?;
        Ok(Self {
            full,
            reduced,
            plan,
        })
    }

    /// Returns the full-resolution patch.
    pub fn full_res(&self) -> &RgbImage {
        &self.full
    }

    /// Returns a view of the reduced-resolution luma patch.
    pub fn reduced(&self) -> ImageView<'_, u8> {
        self.reduced.view()
    }

    /// Returns the correlation plan of the reduced patch.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }

    /// Full-resolution `(width, height)`.
    pub fn full_size(&self) -> (u32, u32) {
        self.full.dimensions()
    }

    /// Reduced-resolution `(width, height)`.
    pub fn reduced_size(&self) -> (usize, usize) {
        (self.reduced.width(), self.reduced.height())
    }
}

#[cfg(test)]
mod tests {
    use super::Template;
    use crate::util::FollowCamError;
    use ::image::{Rgb, RgbImage};

    #[test]
    fn reduced_size_follows_scale() {
        let patch = RgbImage::from_fn(64, 40, |x, y| Rgb([(x * 4) as u8, (y * 6) as u8, 7]));
        let tpl = Template::from_rgb(patch, 0.25).unwrap();
        assert_eq!(tpl.full_size(), (64, 40));
        assert_eq!(tpl.reduced_size(), (16, 10));
        assert_eq!(tpl.plan().width(), 16);
        assert_eq!(tpl.plan().height(), 10);
    }

    #[test]
    fn flat_patch_is_degenerate() {
        let patch = RgbImage::from_pixel(12, 12, Rgb([30, 30, 30]));
        let err = Template::from_rgb(patch, 0.5).unwrap_err();
        assert!(matches!(
            err,
            FollowCamError::DegenerateTemplate {
                reason: "zero variance"
            }
        ));
    }

    #[test]
    fn empty_patch_is_degenerate() {
        let err = Template::from_rgb(RgbImage::new(0, 5), 0.5).unwrap_err();
        assert!(matches!(err, FollowCamError::DegenerateTemplate { .. }));
    }
}
