//! Tracking status marker drawn on preview frames.

use ::image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

const TRACKING: Rgb<u8> = Rgb([0, 255, 0]);
const LOST: Rgb<u8> = Rgb([255, 0, 0]);

const DOT_CENTER: (i32, i32) = (50, 50);
const DOT_RADIUS: i32 = 20;
const BAR_X: i32 = 80;
const BAR_WIDTH: u32 = 120;
const BAR_HEIGHT: u32 = 24;

/// Draws a green dot while tracking; a red dot plus a plain red bar to its
/// right otherwise.
pub fn draw_status(frame: &mut RgbImage, lost: bool) {
    let color = if lost { LOST } else { TRACKING };
    draw_filled_circle_mut(frame, DOT_CENTER, DOT_RADIUS, color);
    if lost {
        let bar = Rect::at(BAR_X, DOT_CENTER.1 - BAR_HEIGHT as i32 / 2).of_size(BAR_WIDTH, BAR_HEIGHT);
        draw_filled_rect_mut(frame, bar, LOST);
    }
}
