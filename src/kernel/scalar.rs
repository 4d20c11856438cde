//! Scalar reference kernel for ZNCC evaluation.

use crate::candidate::topk::{Peak, TopK};
use crate::kernel::{placement_range, zncc_window, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::FollowCamResult;
use crate::ImageView;

/// Scalar ZNCC kernel over every translation.
pub struct ZnccScalar;

impl Kernel for ZnccScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        match placement_range(image, plan) {
            Ok((max_x, max_y)) if x <= max_x && y <= max_y => {
                zncc_window(image, plan, x, y, min_var_i).unwrap_or(f32::NEG_INFINITY)
            }
            _ => f32::NEG_INFINITY,
        }
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

        let mut topk_buf = TopK::new(params.topk);
        for y in 0..=max_y {
            for x in 0..=max_x {
                let Some(score) = zncc_window(image, plan, x, y, params.min_var_i) else {
                    continue;
                };
                if score >= params.min_score {
                    topk_buf.push(Peak {
                        x,
                        y,
                        score,
                        template_idx,
                    });
                }
            }
        }

        Ok(topk_buf.into_sorted_desc())
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccScalar;
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn zncc_scan_matches_bruteforce() {
        let img_width = 6;
        let img_height = 5;
        let mut image = Vec::with_capacity(img_width * img_height);
        for y in 0..img_height {
            for x in 0..img_width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        let tpl_width = 3;
        let tpl_height = 2;
        let mut tpl = Vec::with_capacity(tpl_width * tpl_height);
        for y in 0..tpl_height {
            for x in 0..tpl_width {
                tpl.push(((x * 5 + y * 11 + x * y) & 0xFF) as u8);
            }
        }

        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let tpl_view = ImageView::from_slice(&tpl, tpl_width, tpl_height).unwrap();
        let plan = TemplatePlan::from_view(tpl_view).unwrap();

        let params = ScanParams {
            topk: 1,
            min_var_i: 1e-8,
            min_score: f32::NEG_INFINITY,
        };
        let best = ZnccScalar::scan_full(image_view, &plan, 0, params)
            .unwrap()
            .pop()
            .unwrap();

        let t_prime = plan.t_prime();
        let var_t = plan.var_t() as f64;
        let n = (tpl_width * tpl_height) as f64;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_x = 0;
        let mut best_y = 0;
        for y in 0..=(img_height - tpl_height) {
            for x in 0..=(img_width - tpl_width) {
                let mut dot = 0.0f64;
                let mut sum_i = 0.0f64;
                let mut sum_i2 = 0.0f64;
                for ty in 0..tpl_height {
                    let row = image_view.row(y + ty).unwrap();
                    let base = ty * tpl_width;
                    for tx in 0..tpl_width {
                        let idx = base + tx;
                        let value = row[x + tx] as f64;
                        dot += t_prime[idx] as f64 * value;
                        sum_i += value;
                        sum_i2 += value * value;
                    }
                }
                let var_i = sum_i2 - (sum_i * sum_i) / n;
                if var_i <= 1e-8 {
                    continue;
                }
                let score = dot / (var_t * var_i).sqrt();
                if score > best_score {
                    best_score = score;
                    best_x = x;
                    best_y = y;
                }
            }
        }

        assert_eq!(best.x, best_x);
        assert_eq!(best.y, best_y);
        assert!((best.score - best_score as f32).abs() < 1e-5);
        let at = ZnccScalar::score_at(image_view, &plan, best_x, best_y, 1e-8);
        assert!((at - best.score).abs() < 1e-6);
    }

    #[test]
    fn exact_copy_scores_one() {
        let width = 20;
        let height = 12;
        let image: Vec<u8> = (0..width * height)
            .map(|i| ((i * 29 + (i / width) * 7) % 251) as u8)
            .collect();
        let image_view = ImageView::from_slice(&image, width, height).unwrap();
        let patch = image_view.roi(9, 4, 6, 5).unwrap();
        let plan = TemplatePlan::from_view(patch).unwrap();

        let params = ScanParams {
            topk: 1,
            min_var_i: 1e-3,
            min_score: f32::NEG_INFINITY,
        };
        let best = ZnccScalar::scan_full(image_view, &plan, 0, params).unwrap()[0];
        assert_eq!((best.x, best.y), (9, 4));
        assert!(best.score > 0.999);
    }

    #[test]
    fn out_of_range_placement_scores_negative_infinity() {
        let image = vec![1u8, 2, 3, 4];
        let view = ImageView::from_slice(&image, 2, 2).unwrap();
        let tpl = vec![1u8, 9];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 1).unwrap()).unwrap();
        assert_eq!(ZnccScalar::score_at(view, &plan, 1, 0, 0.0), f32::NEG_INFINITY);
        assert!(ZnccScalar::scan_full(
            ImageView::from_slice(&image, 1, 4).unwrap(),
            &plan,
            0,
            ScanParams {
                topk: 1,
                min_var_i: 0.0,
                min_score: f32::NEG_INFINITY
            }
        )
        .is_err());
    }
}
