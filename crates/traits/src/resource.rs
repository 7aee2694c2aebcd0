//! ResourceProvider trait for abstracting access to external documents.
//!
//! The streaming entry point of the engine never reads files itself. It asks a
//! provider to open a resolved reference as a byte stream and hands that
//! stream to the tokenizer.

use std::fmt::Debug;
use std::io::{BufRead, Cursor};
use std::sync::{Arc, RwLock};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// A byte source the streaming tokenizer can pull from incrementally.
pub type ResourceStream = Box<dyn BufRead + Send>;

/// A trait for loading external documents from various sources.
///
/// # Implementations
///
/// - [`InMemoryResourceProvider`]: pre-populated memory store
/// - [`crate::FilesystemResourceProvider`]: files below a base directory
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load a resource fully into memory.
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    /// Open a resource as an incremental byte stream.
    ///
    /// The default implementation loads the whole resource and wraps it in a
    /// cursor; providers backed by real streams should override it.
    fn open(&self, path: &str) -> Result<ResourceStream, ResourceError> {
        let data = self.load(path)?;
        Ok(Box::new(Cursor::new(SharedBytes(data))))
    }

    /// Check if a resource exists.
    fn exists(&self, path: &str) -> bool;

    /// Get the base path for resolving relative references, if any.
    fn base_path(&self) -> Option<&str> {
        None
    }

    /// Returns a human-readable name for this provider (for logging).
    fn name(&self) -> &'static str;
}

/// Lets a cursor read from shared bytes without copying them.
struct SharedBytes(SharedResourceData);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// An in-memory resource provider.
///
/// Resources must be added before a transformation streams them.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<String, SharedResourceData>>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the store.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<(), ResourceError> {
        let path_string = path.into();
        let mut resources = self
            .resources
            .write()
            .map_err(|_| ResourceError::LoadFailed {
                path: path_string.clone(),
                message: "resource store lock poisoned".to_string(),
            })?;
        resources.insert(path_string, Arc::new(data.into()));
        Ok(())
    }

    /// Builder form of [`add`](Self::add) for test and demo setup.
    pub fn with(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self, ResourceError> {
        self.add(path, data)?;
        Ok(self)
    }

    /// Remove a resource from the store.
    pub fn remove(&self, path: &str) -> Option<SharedResourceData> {
        self.resources.write().ok()?.remove(path)
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let resources = self
            .resources
            .read()
            .map_err(|_| ResourceError::LoadFailed {
                path: path.to_string(),
                message: "resource store lock poisoned".to_string(),
            })?;
        resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(path))
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}
