use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AgentConfig, CaptureConfig};
use crate::errors::PilotResult;
use crate::executor::desktop::Desktop;
use crate::executor::dump::DumpWriter;

/// A screenshot that has been persisted to the dump directory.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub file: PathBuf,
    pub screen_width: u32,
    pub screen_height: u32,
    pub png: Vec<u8>,
}

/// Runs one desktop action per call. Input actions are followed by a short
/// settle pause so the UI reflects them before the next request.
pub struct ActionExecutor {
    desktop: Arc<dyn Desktop>,
    dump: DumpWriter,
    target: (u32, u32),
    settle: Duration,
}

impl ActionExecutor {
    pub fn new(
        desktop: Arc<dyn Desktop>,
        capture: &CaptureConfig,
        agent: &AgentConfig,
    ) -> PilotResult<Self> {
        let dump = DumpWriter::create(&capture.dump_dir, &capture.dump_prefix, capture.dump_start)?;
        Ok(Self {
            desktop,
            dump,
            target: (capture.target_width, capture.target_height),
            settle: agent.settle_delay(),
        })
    }

    /// Index the next screenshot will be written under.
    pub fn dump_index(&self) -> u32 {
        self.dump.next_index()
    }

    pub async fn take_screenshot(&mut self) -> PilotResult<Screenshot> {
        let (w, h) = self.target;
        let frame = self.desktop.capture_screenshot(w, h).await?;
        let file = self.dump.write(&frame.png).await?;
        tracing::info!(
            file = %file.display(),
            screen_w = frame.meta.screen_width,
            screen_h = frame.meta.screen_height,
            "screenshot taken"
        );
        Ok(Screenshot {
            file,
            screen_width: frame.meta.screen_width,
            screen_height: frame.meta.screen_height,
            png: frame.png,
        })
    }

    pub async fn move_mouse(&self, x: f64, y: f64) -> PilotResult<()> {
        tracing::info!(x, y, "move_mouse");
        self.desktop.move_cursor_normalized(x, y).await?;
        self.settle().await;
        Ok(())
    }

    pub async fn click_mouse(&self) -> PilotResult<()> {
        tracing::info!("click_mouse");
        self.desktop.click_left().await?;
        self.settle().await;
        Ok(())
    }

    pub async fn type_text(&self, text: &str) -> PilotResult<()> {
        tracing::info!(chars = text.len(), "type_text");
        self.desktop.inject_text(text).await?;
        self.settle().await;
        Ok(())
    }

    pub async fn scroll_down(&self) -> PilotResult<()> {
        tracing::info!("scroll_down");
        self.desktop.scroll_down().await?;
        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }
}
