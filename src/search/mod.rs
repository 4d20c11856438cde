//! Scale-space template search.
//!
//! Frames are reduced with the library's scale factor, then every template is
//! correlated (ZNCC) against every translation of the reduced frame. The best
//! placement across all templates wins; ties keep the earlier template.

pub mod rescale;

pub use rescale::to_full_res;

use crate::image::{downscale, luma, OwnedImage};
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{Kernel, ScanParams};
use crate::library::ReferenceLibrary;
use crate::trace::{trace_event, trace_span};
use crate::util::FollowCamResult;
use crate::ImageView;
use ::image::RgbImage;

/// Configuration for the matcher.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Minimum variance of an image window for it to be scored.
    pub min_var_i: f32,
    /// Scan each template row-parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_var_i: 1e-3,
            parallel: false,
        }
    }
}

/// Best placement of one template in a reduced frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// ZNCC confidence in `[-1, 1]`.
    pub score: f32,
    /// Top-left x in reduced coordinates.
    pub x: usize,
    /// Top-left y in reduced coordinates.
    pub y: usize,
    /// Reduced width of the matched template.
    pub reduced_width: usize,
    /// Index of the matched template in the library.
    pub template_idx: usize,
}

impl MatchResult {
    /// Full-resolution horizontal center of the match.
    pub fn full_res_center_x(&self, scale: f32) -> f64 {
        to_full_res(self.x, self.reduced_width, scale)
    }
}

/// Stateless multi-template matcher.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matcher configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the matcher configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Converts a full-resolution frame to the reduced luma plane used for search.
    pub fn reduce_frame(&self, frame: &RgbImage, scale: f32) -> FollowCamResult<OwnedImage> {
        let gray = luma(frame)?;
        downscale(gray.view(), scale)
    }

    /// Finds the best match of any library template in `reduced`.
    ///
    /// Returns `None` when the library is empty or no template fits.
    pub fn best_match(
        &self,
        reduced: ImageView<'_, u8>,
        library: &ReferenceLibrary,
    ) -> FollowCamResult<Option<MatchResult>> {
        let _span = trace_span!("best_match", templates = library.len()).entered();

        let params = ScanParams {
            topk: 1,
            min_var_i: self.cfg.min_var_i,
            min_score: f32::NEG_INFINITY,
        };

        let mut best: Option<MatchResult> = None;
        for (idx, template) in library.templates().iter().enumerate() {
            let plan = template.plan();
            if plan.width() > reduced.width() || plan.height() > reduced.height() {
                trace_event!("template_too_large", template = idx);
                continue;
            }
            let peaks = self.scan(reduced, plan, idx, params)?;
            let Some(peak) = peaks.first() else {
                continue;
            };
            let better = best.map_or(true, |b| peak.score > b.score);
            if better {
                best = Some(MatchResult {
                    score: peak.score,
                    x: peak.x,
                    y: peak.y,
                    reduced_width: plan.width(),
                    template_idx: idx,
                });
            }
        }

        if let Some(found) = best {
            trace_event!(
                "best_match",
                score = found.score,
                x = found.x,
                template = found.template_idx
            );
        }
        Ok(best)
    }

    #[cfg(feature = "rayon")]
    fn scan(
        &self,
        reduced: ImageView<'_, u8>,
        plan: &crate::template::TemplatePlan,
        idx: usize,
        params: ScanParams,
    ) -> FollowCamResult<Vec<crate::candidate::topk::Peak>> {
        if self.cfg.parallel {
            crate::kernel::rayon::ZnccRayon::scan_full(reduced, plan, idx, params)
        } else {
            ZnccScalar::scan_full(reduced, plan, idx, params)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn scan(
        &self,
        reduced: ImageView<'_, u8>,
        plan: &crate::template::TemplatePlan,
        idx: usize,
        params: ScanParams,
    ) -> FollowCamResult<Vec<crate::candidate::topk::Peak>> {
        ZnccScalar::scan_full(reduced, plan, idx, params)
    }
}
