use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mirror_core::{PathResolver, ResolveError};
use tempfile::NamedTempFile;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("{0} is a directory")]
    IsDirectory(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Remove everything below `dir`, keeping the directory itself.
pub fn clean_output_dir(dir: &Path) -> Result<(), PersistError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Writes retrieved bodies to their mirrored location, atomically per file.
#[derive(Debug, Clone)]
pub struct AssetWriter {
    resolver: PathResolver,
}

impl AssetWriter {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn write(&self, url: &Url, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.resolver.resolve_url(url)?;
        if target.is_dir() {
            return Err(PersistError::IsDirectory(target));
        }
        write_atomic(&target, content)?;
        Ok(target)
    }
}

/// Write through a temp file in the same directory, then rename over `target`.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<(), PersistError> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}
