//! Key validation
//!
//! Collection names and resource ids become path components, so they are
//! checked against an allow-list before any path is built.

use crate::error::{FolioError, Result};

/// Longest accepted key, in bytes (leaves room for the extension and temp prefix)
pub const MAX_KEY_LEN: usize = 200;

/// Punctuation allowed in keys besides alphanumerics
const ALLOWED_PUNCTUATION: &[char] = &[' ', '_', '-', '.', '@', '+'];

/// Which part of the (collection, resource) pair a key names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Collection,
    Resource,
}

impl KeyKind {
    fn label(self) -> &'static str {
        match self {
            KeyKind::Collection => "collection",
            KeyKind::Resource => "resource",
        }
    }
}

/// Validate a single key
///
/// Rejects:
/// - empty keys
/// - keys longer than `MAX_KEY_LEN` bytes
/// - keys starting with `.` (covers `.`, `..` and hidden temp files)
/// - any character outside alphanumerics and `ALLOWED_PUNCTUATION`
pub fn validate_key(kind: KeyKind, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(FolioError::InvalidKey(format!(
            "{} name must not be empty",
            kind.label()
        )));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(FolioError::InvalidKey(format!(
            "{} name is {} bytes (max {})",
            kind.label(),
            key.len(),
            MAX_KEY_LEN
        )));
    }

    if key.starts_with('.') {
        return Err(FolioError::InvalidKey(format!(
            "{} name must not start with '.': {:?}",
            kind.label(),
            key
        )));
    }

    if let Some(bad) = key
        .chars()
        .find(|c| !c.is_alphanumeric() && !ALLOWED_PUNCTUATION.contains(c))
    {
        return Err(FolioError::InvalidKey(format!(
            "{} name contains disallowed character {:?}: {:?}",
            kind.label(),
            bad,
            key
        )));
    }

    Ok(())
}

/// Validate both halves of a (collection, resource) pair
pub fn validate_pair(collection: &str, resource: &str) -> Result<()> {
    validate_key(KeyKind::Collection, collection)?;
    validate_key(KeyKind::Resource, resource)
}
