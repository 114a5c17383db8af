use std::path::{Path, PathBuf};

use crate::errors::{PilotError, PilotResult};

/// Persists screenshots as `{dir}/{prefix}{index:04}.png` with a strictly
/// increasing index, so nothing is overwritten within a run.
#[derive(Debug)]
pub struct DumpWriter {
    dir: PathBuf,
    prefix: String,
    next_index: u32,
}

impl DumpWriter {
    /// Creates the directory if absent.
    pub fn create(dir: impl AsRef<Path>, prefix: impl Into<String>, start: u32) -> PilotResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PilotError::Dump(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            next_index: start,
        })
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    pub fn path_for(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{}{:04}.png", self.prefix, index))
    }

    /// Writes `png` under the current index and advances it only on success.
    pub async fn write(&mut self, png: &[u8]) -> PilotResult<PathBuf> {
        let path = self.path_for(self.next_index);
        tokio::fs::write(&path, png).await.map_err(|e| {
            PilotError::Dump(format!("cannot write {}: {e}", path.display()))
        })?;
        self.next_index += 1;
        tracing::debug!(file = %path.display(), bytes = png.len(), "screenshot dumped");
        Ok(path)
    }
}
