//! Storage Module
//!
//! File-per-resource document storage.
//!
//! ## Responsibilities
//! - Map (collection, resource) keys to files under a root directory
//! - Serialize writers per collection
//! - Atomic replacement of resource files
//! - Reject keys that could escape the collection directory
//!
//! ## On-Disk Layout
//! ```text
//! {root}/
//! ├── users/
//! │   ├── alice.json
//! │   ├── bob.json
//! │   └── .carol.json.tmp     (in-flight write, renamed over carol.json)
//! └── {collection}/
//!     └── {resource}.json
//! ```
//!
//! Each file holds one pretty-printed JSON document.

mod driver;
mod key;
mod locks;

pub use driver::Driver;
pub use key::{validate_key, validate_pair, KeyKind, MAX_KEY_LEN};
pub use locks::{CollectionLock, LockRegistry};

/// Extension of resource files (without the dot)
pub const FILE_EXTENSION: &str = "json";
