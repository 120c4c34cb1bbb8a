//! Gateway Module
//!
//! Record schema and the create/fetch/list/remove operations on top of the
//! storage driver.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::storage::Driver;

/// Collection holding user records
pub const USERS_COLLECTION: &str = "users";

/// A user record
///
/// All fields are text. Fields missing from a stored document decode as
/// empty strings. `name` is the record's identity and file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub name: String,
    pub age: String,
    pub contact: String,
    pub company: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
}

impl Record {
    /// Create a record with only the identity set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The record's resource id
    pub fn id(&self) -> &str {
        &self.name
    }
}

/// Translates record operations into driver calls
///
/// Outcomes:
/// - absent records come back as `Ok(None)` / `Ok(false)`, not errors
/// - every other driver failure is propagated unchanged
pub struct Gateway {
    driver: Arc<Driver>,
}

impl Gateway {
    pub fn new(driver: Arc<Driver>) -> Self {
        Self { driver }
    }

    /// Store a record, replacing any record with the same name
    ///
    /// Returns the stored record.
    pub fn create(&self, record: Record) -> Result<Record> {
        if record.name.is_empty() {
            return Err(FolioError::InvalidRecord(
                "record name must not be empty".to_string(),
            ));
        }

        self.driver.write(USERS_COLLECTION, record.id(), &record)?;
        Ok(record)
    }

    /// Load a record by name
    pub fn fetch(&self, id: &str) -> Result<Option<Record>> {
        match self.driver.read(USERS_COLLECTION, id) {
            Ok(record) => Ok(Some(record)),
            Err(FolioError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load every record in the collection
    ///
    /// Best effort: records that fail to load are skipped. Failing to list
    /// the collection (e.g. nothing was ever created) is an error.
    pub fn fetch_all(&self) -> Result<Vec<Record>> {
        let ids = self.driver.enumerate(USERS_COLLECTION)?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.driver.read::<Record>(USERS_COLLECTION, &id) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping record '{}': {}", id, e),
            }
        }

        Ok(records)
    }

    /// Delete a record by name
    ///
    /// Returns `false` if no such record existed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        match self.driver.delete(USERS_COLLECTION, id) {
            Ok(()) => Ok(true),
            Err(FolioError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the underlying driver
    pub fn driver(&self) -> &Arc<Driver> {
        &self.driver
    }
}
