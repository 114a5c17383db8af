use serde::{Deserialize, Serialize};

/// One capture of the primary monitor, already scaled to the target resolution.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// PNG-encoded image at the target resolution.
    pub png: Vec<u8>,
    pub meta: ScreenshotMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotMeta {
    /// Actual screen size in pixels, before scaling.
    pub screen_width: u32,
    pub screen_height: u32,
    /// Size of the encoded image.
    pub image_width: u32,
    pub image_height: u32,
}
