use std::{
    fmt::Debug,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

#[cfg(test)]
use parking_lot::RwLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::trace;

use crate::certificate::{CURRENT_MODEL_VERSION, CertificateCollection};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize certificates: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to read certificates: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("Unsupported certificate list version {0}")]
    UnsupportedVersion(u16),
}

/// Persists one certificate collection as a whole.
pub trait Store: Debug + Send + Sync {
    fn fetch(&self) -> Result<CertificateCollection, StoreError>;
    fn save(&self, collection: &CertificateCollection) -> Result<(), StoreError>;
}

/// A [`Store`] backed by a single TOML file.
///
/// Saves write a sibling temporary file and rename it over the original, so a
/// crash mid-save leaves the previous list intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    fn fetch(&self) -> Result<CertificateCollection, StoreError> {
        if !self.path.exists() {
            return Ok(CertificateCollection::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let collection: CertificateCollection = toml::from_str(&contents)?;

        if collection.model_version > CURRENT_MODEL_VERSION {
            return Err(StoreError::UnsupportedVersion(collection.model_version));
        }

        trace!(
            "Fetched {} certificates from {}",
            collection.len(),
            self.path.display()
        );

        Ok(collection)
    }

    fn save(&self, collection: &CertificateCollection) -> Result<(), StoreError> {
        let contents = toml::to_string_pretty(collection)?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;

        trace!(
            "Saved {} certificates to {}",
            collection.len(),
            self.path.display()
        );

        Ok(())
    }
}

/// A memory backed [`Store`] for use in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    collection: RwLock<CertificateCollection>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn fetch(&self) -> Result<CertificateCollection, StoreError> {
        Ok(self.collection.read().clone())
    }

    fn save(&self, collection: &CertificateCollection) -> Result<(), StoreError> {
        *self.collection.write() = collection.clone();
        Ok(())
    }
}
