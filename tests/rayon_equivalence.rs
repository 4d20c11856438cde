#![cfg(feature = "rayon")]

use followcam::kernel::rayon::ZnccRayon;
use followcam::kernel::scalar::ZnccScalar;
use followcam::{ImageView, Kernel, MatchConfig, Matcher, ReferenceLibrary, ScanParams, TemplatePlan};
use image::{imageops, Rgb, RgbImage};

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11) ^ (y * 3) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn extract_patch(image: &[u8], img_width: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        let row = (y0 + y) * img_width;
        out.extend_from_slice(&image[row + x0..row + x0 + w]);
    }
    out
}

#[test]
fn parallel_scan_matches_sequential_topk() {
    let (img_width, img_height) = (120, 90);
    let image = make_image(img_width, img_height);
    let view = ImageView::from_slice(&image, img_width, img_height).unwrap();
    let tpl = extract_patch(&image, img_width, 37, 21, 24, 18);
    let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 24, 18).unwrap()).unwrap();

    let params = ScanParams {
        topk: 8,
        min_var_i: 1e-3,
        min_score: f32::NEG_INFINITY,
    };
    let seq = ZnccScalar::scan_full(view, &plan, 3, params).unwrap();
    let par = ZnccRayon::scan_full(view, &plan, 3, params).unwrap();

    assert_eq!(seq.len(), par.len());
    for (a, b) in seq.iter().zip(par.iter()) {
        assert_eq!((a.x, a.y, a.template_idx), (b.x, b.y, b.template_idx));
        assert!((a.score - b.score).abs() < 1e-6);
    }
    assert_eq!((seq[0].x, seq[0].y), (37, 21));
}

#[test]
fn parallel_matcher_agrees_with_sequential() {
    let mut frame = RgbImage::from_pixel(400, 240, Rgb([30, 60, 90]));
    let sprite = RgbImage::from_fn(48, 40, |x, y| {
        let v = ((x * 11) ^ (y * 7) ^ (x * y)) as u8;
        Rgb([v, v / 2, 255 - v])
    });
    imageops::replace(&mut frame, &sprite, 200, 120);

    let mut library = ReferenceLibrary::new(0.25).unwrap();
    library.add(sprite).unwrap();

    let seq = Matcher::new();
    let par = Matcher::new().with_config(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    });
    let reduced = seq.reduce_frame(&frame, library.scale()).unwrap();
    let a = seq.best_match(reduced.view(), &library).unwrap().unwrap();
    let b = par.best_match(reduced.view(), &library).unwrap().unwrap();
    assert_eq!((a.x, a.y, a.template_idx), (b.x, b.y, b.template_idx));
    assert_eq!((a.x, a.y), (50, 30));
}
