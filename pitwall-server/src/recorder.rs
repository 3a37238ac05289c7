//! Session recorder (NDJSON)
//!
//! Appends every published snapshot to a file, one JSON object per line.

use anyhow::{Context, Result};
use pitwall_core::{FieldMask, TelemetrySnapshot};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SessionRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    mask: Option<FieldMask>,
    written: u64,
}

impl SessionRecorder {
    pub fn create(path: impl AsRef<Path>, mask: Option<FieldMask>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        info!(path = %path.display(), "Recording session");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            mask,
            written: 0,
        })
    }

    pub fn record(&mut self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let json = snapshot.to_json_filtered(self.mask.as_ref())?;
        writeln!(self.writer, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
