//! Durable scalar progress marker, one instance per phase.
//!
//! `save` is atomic: write to `path.tmp`, `sync_all`, then `rename` over
//! `path`. A reader opening `path` at any point sees either the
//! previously-committed value or the new one, never a partial write.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::domain::Checkpoint;
use crate::error::Result;

pub struct CheckpointStore {
    path: PathBuf,
    enabled: bool,
    cached: Checkpoint,
}

impl CheckpointStore {
    /// Loads the checkpoint from disk at construction time. If disabled,
    /// every operation becomes a no-op and `get` always returns the zero
    /// checkpoint.
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Result<Self> {
        let path = path.into();
        let cached = if enabled { load(&path)? } else { Checkpoint::default() };
        Ok(CheckpointStore { path, enabled, cached })
    }

    pub fn get(&self) -> Checkpoint {
        self.cached.clone()
    }

    pub fn save(&mut self, checkpoint: Checkpoint) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = tmp_path(&self.path);
        let file = File::create(&tmp_path)?;
        serde_json::to_writer(&file, &checkpoint)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        self.cached = checkpoint;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.enabled && self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        self.cached = Checkpoint::default();
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

fn load(path: &Path) -> Result<Checkpoint> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Checkpoint::default()),
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() {
        return Ok(Checkpoint::default());
    }
    Ok(serde_json::from_slice(&bytes).unwrap_or_default())
}

// serde_json's errors don't flow through `From` on `PipelineError` since
// we only ever surface them wrapped in an `io::Error`-shaped path above;
// `to_writer`/`from_slice` failures are treated as IO-adjacent.
impl From<serde_json::Error> for crate::error::PipelineError {
    fn from(e: serde_json::Error) -> Self {
        crate::error::PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
