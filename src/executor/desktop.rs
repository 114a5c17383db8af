use async_trait::async_trait;

use crate::errors::{PilotError, PilotResult};
use crate::executor::input;
use crate::perception::screenshot::capture_primary;
use crate::perception::types::CapturedFrame;

/// The OS automation surface the agent acts through.
///
/// Every call is side-effecting and completes before returning. An `Err` is
/// fatal to the run; implementations do not retry.
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Captures the screen scaled to `target_w` x `target_h`. The returned
    /// metadata carries the actual screen size.
    async fn capture_screenshot(&self, target_w: u32, target_h: u32)
        -> PilotResult<CapturedFrame>;

    /// Moves the cursor to a point given in 0..=1000 screenshot-relative units.
    async fn move_cursor_normalized(&self, x: f64, y: f64) -> PilotResult<()>;

    async fn click_left(&self) -> PilotResult<()>;

    /// Types into whatever control holds focus.
    async fn inject_text(&self, text: &str) -> PilotResult<()>;

    async fn scroll_down(&self) -> PilotResult<()>;
}

/// Real desktop backed by xcap and enigo.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDesktop;

async fn blocking<T, F>(f: F) -> PilotResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PilotResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PilotError::Desktop(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl Desktop for NativeDesktop {
    async fn capture_screenshot(
        &self,
        target_w: u32,
        target_h: u32,
    ) -> PilotResult<CapturedFrame> {
        blocking(move || {
            let cursor = match input::cursor_location() {
                Ok(pos) => Some(pos),
                Err(e) => {
                    tracing::warn!(error = %e, "cursor position unavailable, capturing without marker");
                    None
                }
            };
            capture_primary(target_w, target_h, cursor)
        })
        .await
    }

    async fn move_cursor_normalized(&self, x: f64, y: f64) -> PilotResult<()> {
        let (px, py) = blocking(move || input::move_mouse_normalized(x, y)).await?;
        tracing::debug!(x, y, px, py, "cursor moved");
        Ok(())
    }

    async fn click_left(&self) -> PilotResult<()> {
        blocking(input::mouse_click).await
    }

    async fn inject_text(&self, text: &str) -> PilotResult<()> {
        let text = text.to_string();
        blocking(move || input::type_text(&text)).await
    }

    async fn scroll_down(&self) -> PilotResult<()> {
        blocking(input::scroll_down).await
    }
}
