// Normalized (0..=1000) coordinates to absolute display pixels.
use crate::executor::payload::COORD_MAX;

/// Maps a normalized point onto a `width` x `height` display whose origin is
/// `(origin_x, origin_y)`. 1000 lands on the last pixel, never one past it.
pub fn normalized_to_physical(
    x: f64,
    y: f64,
    origin: (i32, i32),
    width: u32,
    height: u32,
) -> (i32, i32) {
    let span = |v: f64, extent: u32| -> i32 {
        let last = extent.saturating_sub(1) as f64;
        (v.clamp(0.0, COORD_MAX) / COORD_MAX * last).round() as i32
    };
    (origin.0 + span(x, width), origin.1 + span(y, height))
}

/// Maps a physical point back into a `target_w` x `target_h` image of the same display.
pub fn physical_to_image(
    px: i32,
    py: i32,
    origin: (i32, i32),
    width: u32,
    height: u32,
    target_w: u32,
    target_h: u32,
) -> Option<(u32, u32)> {
    let rx = px - origin.0;
    let ry = py - origin.1;
    if rx < 0 || ry < 0 || rx as u32 >= width || ry as u32 >= height {
        return None;
    }
    let ix = (rx as u64 * target_w as u64 / width as u64) as u32;
    let iy = (ry as u64 * target_h as u64 / height as u64) as u32;
    Some((ix, iy))
}
