//! Storage Driver
//!
//! Maps (collection, resource) keys to JSON files under a root directory.
//!
//! ## Responsibilities
//! - Create the root directory on startup
//! - Serialize writes per collection
//! - Replace files atomically so readers never see a torn write
//! - Enumerate the resources of a collection

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FolioError, Result};

use super::key::{self, KeyKind};
use super::locks::LockRegistry;
use super::FILE_EXTENSION;

/// File-per-resource storage driver
///
/// ## Concurrency:
/// - `write` / `delete`: hold the collection's lock for the whole operation
/// - `read` / `enumerate`: lock-free; writes land by rename, so a read sees
///   either the old file or the new one, never a mix
/// - All methods use `&self`; share the driver through `Arc`
pub struct Driver {
    /// Canonical root directory
    root: PathBuf,

    /// Per-collection write locks
    locks: LockRegistry,
}

impl Driver {
    /// Open or create a store rooted at `path`
    ///
    /// The directory (and any missing parents) is created owner-only.
    /// Opening an existing directory reuses it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        create_private_dir(path)?;
        let root = path.canonicalize()?;

        tracing::debug!("Opened store at {}", root.display());

        Ok(Self {
            root,
            locks: LockRegistry::new(),
        })
    }

    /// Serialize `payload` and store it as `<root>/<collection>/<resource>.json`
    ///
    /// Overwrites any existing resource with the same id.
    pub fn write<T>(&self, collection: &str, resource: &str, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        key::validate_pair(collection, resource)?;

        let bytes = serde_json::to_vec_pretty(payload)
            .map_err(|e| FolioError::Encoding(e.to_string()))?;

        let lock = self.locks.lock_for(collection);
        let _guard = lock.lock();

        let dir = self.collection_dir(collection);
        create_private_dir(&dir)?;

        let final_path = self.resource_path(collection, resource);
        let temp_path = dir.join(format!(".{}.{}.tmp", resource, FILE_EXTENSION));

        if let Err(e) = write_and_sync(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::debug!(
            "Wrote {}/{} ({} bytes)",
            collection,
            resource,
            bytes.len()
        );
        Ok(())
    }

    /// Load and decode a resource
    ///
    /// Takes no lock. Missing or unreadable files are `NotFound`.
    pub fn read<T: DeserializeOwned>(&self, collection: &str, resource: &str) -> Result<T> {
        key::validate_pair(collection, resource)?;

        let path = self.resource_path(collection, resource);
        let bytes = fs::read(&path).map_err(|e| {
            tracing::trace!("Read of {} failed: {}", path.display(), e);
            FolioError::not_found(collection, resource)
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            FolioError::Decoding(format!("{}/{}: {}", collection, resource, e))
        })
    }

    /// Remove a resource
    pub fn delete(&self, collection: &str, resource: &str) -> Result<()> {
        key::validate_pair(collection, resource)?;

        let lock = self.locks.lock_for(collection);
        let _guard = lock.lock();

        match fs::remove_file(self.resource_path(collection, resource)) {
            Ok(()) => {
                tracing::debug!("Deleted {}/{}", collection, resource);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FolioError::not_found(collection, resource))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List resource ids in a collection
    ///
    /// Only regular `.json` files count. Fails with `Io` if the collection
    /// directory cannot be listed; an empty directory yields an empty list.
    /// Order is whatever the filesystem returns.
    pub fn enumerate(&self, collection: &str) -> Result<Vec<String>> {
        key::validate_key(KeyKind::Collection, collection)?;

        let mut ids = Vec::new();
        for entry in fs::read_dir(self.collection_dir(collection))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            if let Some(id) = file_name.to_str().and_then(parse_resource_id) {
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a collection
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// File backing a resource
    pub fn resource_path(&self, collection: &str, resource: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.{}", resource, FILE_EXTENSION))
    }

    /// Access the lock registry (for testing/debugging)
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

/// "alice.json" → Some("alice"); temp files and other extensions → None
fn parse_resource_id(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') {
        return None;
    }
    let id = file_name
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}
