//! Rayon-parallel ZNCC kernel (feature-gated).
//!
//! Parallelizes one template scan over rows of placements. Peaks are merged
//! through the same ranking as the scalar kernel, so both kernels return the
//! same best peak for the same inputs.

use crate::candidate::topk::{Peak, TopK};
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{placement_range, zncc_window, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::FollowCamResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel ZNCC kernel.
pub struct ZnccRayon;

impl Kernel for ZnccRayon {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        ZnccScalar::score_at(image, plan, x, y, min_var_i)
    }

    fn scan_full(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        template_idx: usize,
        params: ScanParams,
    ) -> FollowCamResult<Vec<Peak>> {
        let (max_x, max_y) = placement_range(image, plan)?;
        if params.topk == 0 {
            return Ok(Vec::new());
        }

        let row_results: Vec<Vec<Peak>> = (0..=max_y)
            .into_par_iter()
            .map(|y| {
                let mut row_topk = TopK::new(params.topk);
                for x in 0..=max_x {
                    let Some(score) = zncc_window(image, plan, x, y, params.min_var_i) else {
                        continue;
                    };
                    if score >= params.min_score {
                        row_topk.push(Peak {
                            x,
                            y,
                            score,
                            template_idx,
                        });
                    }
                }
                row_topk.into_sorted_desc()
            })
            .collect();

        let mut topk = TopK::new(params.topk);
        for peaks in row_results {
            for peak in peaks {
                topk.push(peak);
            }
        }

        Ok(topk.into_sorted_desc())
    }
}
