// Primary-monitor capture via xcap, scaled to the requested resolution.
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::errors::{PilotError, PilotResult};
use crate::executor::coordinator::physical_to_image;
use crate::perception::types::{CapturedFrame, ScreenshotMeta};

const CURSOR_FILL: Rgba<u8> = Rgba([255, 32, 32, 255]);
const CURSOR_OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CURSOR_ARM: i64 = 8;

/// Captures the primary monitor, resizes it to `target_w` x `target_h` and
/// marks `cursor` (absolute display coordinates) with a crosshair.
/// Blocking; call from a blocking thread.
pub fn capture_primary(
    target_w: u32,
    target_h: u32,
    cursor: Option<(i32, i32)>,
) -> PilotResult<CapturedFrame> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| PilotError::Desktop(format!("monitor enumeration failed: {e}")))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| PilotError::Desktop("no monitor found".into()))?;

    let raw = monitor
        .capture_image()
        .map_err(|e| PilotError::Desktop(format!("screen capture failed: {e}")))?;
    let (screen_w, screen_h) = raw.dimensions();

    let mut frame = if (screen_w, screen_h) == (target_w, target_h) {
        raw
    } else {
        image::imageops::resize(&raw, target_w, target_h, FilterType::Triangle)
    };

    if let Some((cx, cy)) = cursor {
        let origin = (monitor.x(), monitor.y());
        if let Some((ix, iy)) = physical_to_image(
            cx,
            cy,
            origin,
            monitor.width(),
            monitor.height(),
            target_w,
            target_h,
        ) {
            draw_cursor(&mut frame, ix, iy);
        }
    }

    let png = encode_png(frame)?;
    tracing::debug!(
        screen = %format!("{screen_w}x{screen_h}"),
        target = %format!("{target_w}x{target_h}"),
        bytes = png.len(),
        "screen captured"
    );
    Ok(CapturedFrame {
        png,
        meta: ScreenshotMeta {
            screen_width: screen_w,
            screen_height: screen_h,
            image_width: target_w,
            image_height: target_h,
        },
    })
}

pub fn encode_png(frame: RgbaImage) -> PilotResult<Vec<u8>> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| PilotError::Desktop(format!("PNG encode: {e}")))?;
    Ok(out)
}

/// Crosshair with a one-pixel light outline so it shows on any background.
fn draw_cursor(canvas: &mut RgbaImage, x: u32, y: u32) {
    let (cx, cy) = (x as i64, y as i64);
    for d in -CURSOR_ARM..=CURSOR_ARM {
        for off in [-1, 1] {
            set_pixel(canvas, cx + d, cy + off, CURSOR_OUTLINE);
            set_pixel(canvas, cx + off, cy + d, CURSOR_OUTLINE);
        }
    }
    for d in -CURSOR_ARM..=CURSOR_ARM {
        set_pixel(canvas, cx + d, cy, CURSOR_FILL);
        set_pixel(canvas, cx, cy + d, CURSOR_FILL);
    }
}

fn set_pixel(canvas: &mut RgbaImage, x: i64, y: i64, col: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, col);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_marker_is_clipped_at_edges() {
        let mut canvas = RgbaImage::new(10, 10);
        draw_cursor(&mut canvas, 0, 9);
        assert_eq!(*canvas.get_pixel(0, 9), CURSOR_FILL);
        assert_eq!(*canvas.get_pixel(5, 9), CURSOR_FILL);
        assert_eq!(*canvas.get_pixel(5, 5), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn encoded_frames_are_png() {
        let png = encode_png(RgbaImage::new(4, 3)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
