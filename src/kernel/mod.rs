//! Correlation kernel implementations.

use crate::candidate::topk::Peak;
use crate::template::TemplatePlan;
use crate::util::{FollowCamError, FollowCamResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Maximum number of peaks to retain.
    pub topk: usize,
    /// Minimum variance threshold for the image window.
    pub min_var_i: f32,
    /// Minimum score threshold (discard below this value).
    pub min_score: f32,
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` for placements outside the image or over
    /// flat windows.
    fn score_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize, min_var_i: f32)
        -> f32;

    /// Scans the full valid placement range and returns top-K peaks.
    fn scan_full(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        template_idx: usize,
        params: ScanParams,
    ) -> FollowCamResult<Vec<Peak>>;
}

/// Returns the largest valid top-left placement, or an error if the template
/// does not fit inside the image.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> FollowCamResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(FollowCamError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: tpl_width,
            height: tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

/// ZNCC score of `plan` against the image window at `(x, y)`.
///
/// The caller guarantees the placement is valid.
#[inline]
pub(crate) fn zncc_window(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    x: usize,
    y: usize,
    min_var_i: f32,
) -> Option<f32> {
    let tpl_width = plan.width();
    let t_prime = plan.t_prime();
    let n = (tpl_width * plan.height()) as f64;

    // Window sums are exact integers; only the template dot product is float.
    let mut dot = 0.0f32;
    let mut sum_i = 0u64;
    let mut sum_i2 = 0u64;
    for ty in 0..plan.height() {
        let img_row = &image.row(y + ty)?[x..x + tpl_width];
        let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];
        for (&t, &pixel) in tpl_row.iter().zip(img_row) {
            let value = u64::from(pixel);
            dot += t * f32::from(pixel);
            sum_i += value;
            sum_i2 += value * value;
        }
    }

    let sum_i = sum_i as f64;
    let var_i = (sum_i2 as f64 - sum_i * sum_i / n) as f32;
    if var_i <= min_var_i {
        return None;
    }
    let score = dot / (plan.var_t() * var_i).sqrt();
    score.is_finite().then_some(score)
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
