//! # FolioDB
//!
//! A minimal file-backed document store with:
//! - One JSON file per record, one directory per collection
//! - Per-collection write serialization
//! - Atomic file replacement (readers never see a torn write)
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Gateway                                 │
//! │          (create / fetch / fetch_all / remove)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Storage Driver                             │
//! │     write/delete: collection lock    read: lock-free         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!              {root}/{collection}/{resource}.json
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod gateway;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FolioError, Result};
pub use config::Config;
pub use gateway::{Gateway, Record};
pub use storage::Driver;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FolioDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
