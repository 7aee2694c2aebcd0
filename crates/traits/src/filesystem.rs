//! Filesystem-backed resource provider.
//!
//! Streamed documents are opened with a buffered file reader, so a large
//! input is never read into memory in one piece.
//!
//! # Security
//!
//! Every resolved path must stay within the base directory; absolute paths
//! and `..` escapes are reported as `NotFound`.

use crate::resource::{ResourceError, ResourceProvider, ResourceStream, SharedResourceData};
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Loads and streams documents below a base directory.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    base_path: PathBuf,
    /// Canonical form of `base_path`, when it exists at construction time.
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    /// Resolves `path` below the base directory, or `None` if it escapes it.
    fn resolve_path_safe(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return None;
        }

        let full_path = self.base_path.join(relative);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(base) = &self.canonical_base
        {
            return canonical.starts_with(base).then_some(canonical);
        }

        // Not on disk yet: fall back to a lexical check.
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }

        Some(full_path)
    }

    fn resolve_or_not_found(&self, path: &str) -> Result<PathBuf, ResourceError> {
        self.resolve_path_safe(path)
            .ok_or_else(|| ResourceError::NotFound(format!("{path} (outside base directory)")))
    }
}

fn map_io_error(path: &str, err: std::io::Error) -> ResourceError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ResourceError::NotFound(path.to_string())
    } else {
        ResourceError::LoadFailed {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self.resolve_or_not_found(path)?;
        std::fs::read(&full_path)
            .map(Arc::new)
            .map_err(|e| map_io_error(path, e))
    }

    fn open(&self, path: &str) -> Result<ResourceStream, ResourceError> {
        let full_path = self.resolve_or_not_found(path)?;
        let file = File::open(&full_path).map_err(|e| map_io_error(path, e))?;
        log::trace!("opened '{}' for streaming", full_path.display());
        Ok(Box::new(BufReader::new(file)))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path_safe(path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn base_path(&self) -> Option<&str> {
        self.base_path.to_str()
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
