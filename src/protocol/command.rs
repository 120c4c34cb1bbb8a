//! Command definitions
//!
//! Represents commands from clients.

use crate::gateway::Record;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Create = 0x01,
    Fetch = 0x02,
    FetchAll = 0x03,
    Remove = 0x04,
    Ping = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Store a record
    Create { record: Record },

    /// Load a record by name
    Fetch { name: String },

    /// Load every record
    FetchAll,

    /// Delete a record by name
    Remove { name: String },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Create { .. } => CommandType::Create,
            Command::Fetch { .. } => CommandType::Fetch,
            Command::FetchAll => CommandType::FetchAll,
            Command::Remove { .. } => CommandType::Remove,
            Command::Ping => CommandType::Ping,
        }
    }
}
