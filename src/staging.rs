use crate::{
    config::Config,
    format::InputFormat,
    util::{ensure_dir, temp_prefix},
};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{debug, warn};

/// On-disk state for one request: the staged upload (if any) and the
/// scratch dir the runner writes picture crops into. Dropping it removes both.
pub struct Staged {
    upload: Option<NamedTempFile>,
    scratch: Option<TempDir>,
    input: PathBuf,
}

impl Staged {
    /// Writes `bytes` to a temp file named with the format's extension.
    pub fn upload(cfg: &Config, filename: &str, format: InputFormat, bytes: &[u8]) -> Result<Self> {
        let root = staging_root(cfg)?;
        let mut file = Builder::new()
            .prefix(&temp_prefix(filename))
            .suffix(format.suffix())
            .tempfile_in(&root)
            .with_context(|| format!("creating temp file in {}", root.display()))?;
        file.write_all(bytes).with_context(|| "writing upload")?;
        file.flush().with_context(|| "flushing upload")?;
        let input = file.path().to_path_buf();
        debug!("staged {} bytes at {}", bytes.len(), input.display());
        Ok(Self {
            upload: Some(file),
            scratch: Some(scratch_dir(&root)?),
            input,
        })
    }

    /// Uses an existing file as input; only the scratch dir is temporary.
    pub fn existing(cfg: &Config, input: &Path) -> Result<Self> {
        let root = staging_root(cfg)?;
        Ok(Self {
            upload: None,
            scratch: Some(scratch_dir(&root)?),
            input: input.to_path_buf(),
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn scratch(&self) -> &Path {
        match &self.scratch {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        if let Some(file) = self.upload.take() {
            let path = file.path().to_path_buf();
            if let Err(err) = file.close() {
                warn!("failed to remove staged upload {}: {err}", path.display());
            }
        }
        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                warn!("failed to remove scratch dir {}: {err}", path.display());
            }
        }
    }
}

fn staging_root(cfg: &Config) -> Result<PathBuf> {
    if cfg.paths.temp_dir.is_empty() {
        return Ok(std::env::temp_dir());
    }
    let root = PathBuf::from(&cfg.paths.temp_dir);
    ensure_dir(&root)?;
    Ok(root)
}

fn scratch_dir(root: &Path) -> Result<TempDir> {
    Builder::new()
        .prefix("crops-")
        .tempdir_in(root)
        .with_context(|| format!("creating scratch dir in {}", root.display()))
}
