#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::loader::source_name;
use crate::{DocQaError, Result};

/// Staging directory for uploaded files, keyed by original file name.
/// Staging a file with an existing name overwrites it.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    #[inline]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_dir_path())
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the staging directory under its basename
    #[inline]
    pub fn stage(&self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(DocQaError::InvalidInput(format!(
                "{} is not a file",
                source.display()
            )));
        }

        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(source_name(source));

        let already_staged = match (source.canonicalize(), target.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if already_staged {
            debug!("{} is already staged", target.display());
        } else {
            std::fs::copy(source, &target)?;
            debug!("Staged {} as {}", source.display(), target.display());
        }

        Ok(target)
    }

    /// File names of everything staged, sorted
    #[inline]
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the staging directory and everything in it
    #[inline]
    pub async fn clear(&self) -> Result<()> {
        if remove_dir_if_exists(&self.dir).await? {
            info!("Cleared upload directory {}", self.dir.display());
        }
        Ok(())
    }
}

/// Remove `dir` recursively. Returns whether anything was removed.
pub(crate) async fn remove_dir_if_exists(dir: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
