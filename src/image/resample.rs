//! Area-average resampling for grayscale `u8` images.
//!
//! Each destination pixel is the coverage-weighted mean of the source pixels
//! its footprint overlaps, computed separably (rows, then columns). For integer
//! reduction ratios this is an exact box filter, so a patch placed on the
//! reduction grid downsamples to the same pixels whether it is resampled alone
//! or as part of a larger frame.

use crate::image::{ImageView, OwnedImage};
use crate::util::{FollowCamError, FollowCamResult};

/// Returns the reduced length of an `n`-pixel extent at `scale`.
///
/// The result is `round(n * scale)`, never less than one pixel.
pub fn reduced_len(n: usize, scale: f32) -> usize {
    ((n as f64 * f64::from(scale)).round() as usize).max(1)
}

/// Per-destination list of `(source index, weight)` pairs along one axis.
///
/// Destination pixel `d` covers the source span `[d * ratio, (d + 1) * ratio)`
/// clipped to `src_len`; weights are normalized over the covered part.
fn axis_weights(src_len: usize, dst_len: usize, ratio: f64) -> Vec<Vec<(usize, f32)>> {
    let limit = src_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = (d as f64 * ratio).min(limit);
            let end = ((d + 1) as f64 * ratio).min(limit);
            let s0 = (start.floor() as usize).min(src_len.saturating_sub(1));
            let s1 = (end.ceil() as usize).clamp(s0 + 1, src_len);
            let mut taps = Vec::with_capacity(s1 - s0);
            for s in s0..s1 {
                let overlap = end.min((s + 1) as f64) - start.max(s as f64);
                if overlap > 1e-9 {
                    taps.push((s, overlap));
                }
            }
            if taps.is_empty() {
                // Span collapsed onto the last source pixel.
                return vec![(s0, 1.0)];
            }
            let covered: f64 = taps.iter().map(|&(_, w)| w).sum();
            taps.into_iter()
                .map(|(s, w)| (s, (w / covered) as f32))
                .collect()
        })
        .collect()
}

/// Resizes `src` to `dst_width x dst_height` with area averaging.
pub fn resize_area(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> FollowCamResult<OwnedImage> {
    let ratio_x = src.width() as f64 / dst_width.max(1) as f64;
    let ratio_y = src.height() as f64 / dst_height.max(1) as f64;
    resample(src, dst_width, dst_height, ratio_x, ratio_y)
}

fn resample(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
    ratio_x: f64,
    ratio_y: f64,
) -> FollowCamResult<OwnedImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(FollowCamError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    let src_width = src.width();
    let src_height = src.height();
    if src_width == 0 || src_height == 0 {
        return Err(FollowCamError::InvalidDimensions {
            width: src_width,
            height: src_height,
        });
    }

    let cols = axis_weights(src_width, dst_width, ratio_x);
    let rows = axis_weights(src_height, dst_height, ratio_y);

    // Horizontal pass: src_height x dst_width intermediate.
    let mut tmp = vec![0.0f32; src_height * dst_width];
    for y in 0..src_height {
        let row = src.row(y).ok_or(FollowCamError::BufferTooSmall {
            needed: (y + 1) * src.stride(),
            got: 0,
        })?;
        let out = &mut tmp[y * dst_width..(y + 1) * dst_width];
        for (dx, taps) in cols.iter().enumerate() {
            out[dx] = taps
                .iter()
                .map(|&(sx, w)| f32::from(row[sx]) * w)
                .sum();
        }
    }

    let mut dst = vec![0u8; dst_width * dst_height];
    for (dy, taps) in rows.iter().enumerate() {
        for dx in 0..dst_width {
            let value: f32 = taps
                .iter()
                .map(|&(sy, w)| tmp[sy * dst_width + dx] * w)
                .sum();
            dst[dy * dst_width + dx] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    OwnedImage::new(dst, dst_width, dst_height)
}

/// Downscales `src` by `scale` on both axes using [`reduced_len`] sizing.
///
/// Sampling uses the fixed ratio `1 / scale` rather than the ratio of the
/// rounded sizes, so every image reduced at one scale shares the same grid.
pub fn downscale(src: ImageView<'_, u8>, scale: f32) -> FollowCamResult<OwnedImage> {
    if !(scale > 0.0 && scale <= 1.0) {
        return Err(FollowCamError::InvalidConfig("scale must be in (0, 1]"));
    }
    let dst_width = reduced_len(src.width(), scale);
    let dst_height = reduced_len(src.height(), scale);
    let ratio = 1.0 / f64::from(scale);
    resample(src, dst_width, dst_height, ratio, ratio)
}

#[cfg(test)]
mod tests {
    use super::{downscale, reduced_len, resize_area};
    use crate::image::ImageView;

    #[test]
    fn reduced_len_rounds_and_never_collapses() {
        assert_eq!(reduced_len(1920, 0.25), 480);
        assert_eq!(reduced_len(66, 0.25), 17);
        assert_eq!(reduced_len(1, 0.25), 1);
        assert_eq!(reduced_len(50, 1.0), 50);
    }

    #[test]
    fn integer_ratio_is_a_box_filter() {
        let data: Vec<u8> = (0u8..16).collect();
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let out = resize_area(view, 2, 2).unwrap();
        // ((0 + 1 + 4 + 5) / 4) = 2.5 rounds to 3 (round half away from zero).
        assert_eq!(out.data(), &[3u8, 5, 11, 13]);
    }

    #[test]
    fn unit_scale_is_identity() {
        let data: Vec<u8> = (0u8..12).map(|v| v * 20).collect();
        let view = ImageView::from_slice(&data, 4, 3).unwrap();
        let out = downscale(view, 1.0).unwrap();
        assert_eq!(out.data(), data.as_slice());
    }

    #[test]
    fn fractional_ratio_preserves_constant_images() {
        let data = vec![90u8; 7 * 5];
        let view = ImageView::from_slice(&data, 7, 5).unwrap();
        let out = resize_area(view, 3, 2).unwrap();
        assert!(out.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn grid_aligned_patch_downsamples_identically() {
        let width = 32;
        let height = 16;
        let frame: Vec<u8> = (0..width * height)
            .map(|i| ((i * 37 + (i / width) * 11) & 0xFF) as u8)
            .collect();
        let frame_view = ImageView::from_slice(&frame, width, height).unwrap();
        let reduced_frame = downscale(frame_view, 0.25).unwrap();

        let patch = frame_view.roi(8, 4, 12, 8).unwrap();
        let reduced_patch = downscale(patch, 0.25).unwrap();

        let region = reduced_frame.view().roi(2, 1, 3, 2).unwrap();
        for y in 0..2 {
            assert_eq!(region.row(y).unwrap(), reduced_patch.view().row(y).unwrap());
        }
    }

    #[test]
    fn ragged_width_keeps_the_scale_grid() {
        // 18 columns at 0.25 round to 5; the last column covers only 2 pixels.
        let width = 18;
        let height = 4;
        let frame: Vec<u8> = (0..width * height)
            .map(|i| ((i % width) * 13 + (i / width) * 3) as u8)
            .collect();
        let view = ImageView::from_slice(&frame, width, height).unwrap();
        let reduced = downscale(view, 0.25).unwrap();
        assert_eq!(reduced.width(), 5);

        let patch = view.roi(12, 0, 4, 4).unwrap();
        let reduced_patch = downscale(patch, 0.25).unwrap();
        assert_eq!(
            reduced.view().get(3, 0).copied(),
            reduced_patch.view().get(0, 0).copied()
        );

        let tail = view.roi(16, 0, 2, 4).unwrap();
        let tail_mean = (0..4)
            .flat_map(|y| tail.row(y).unwrap().iter().map(|&v| f32::from(v)))
            .sum::<f32>()
            / 8.0;
        assert_eq!(reduced.view().get(4, 0).copied(), Some(tail_mean.round() as u8));
    }

    #[test]
    fn downscale_rejects_invalid_scale() {
        let data = vec![0u8; 4];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        assert!(downscale(view, 0.0).is_err());
        assert!(downscale(view, 1.5).is_err());
    }
}
