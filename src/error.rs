//! Error types for the map and the variable tables built on it.

use thiserror::Error;

/// Recoverable failure of a map insertion.
///
/// The map is left exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Storage for the key copy or the entry table could not be reserved
    #[error("out of memory reserving {bytes} bytes for map entry")]
    OutOfMemory { bytes: usize },
}

/// Malformed `name=value` assignment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    #[error("invalid variable assignment '{0}': expected NAME=VALUE")]
    MissingSeparator(String),
    #[error("invalid variable assignment '{0}': empty variable name")]
    EmptyName(String),
    #[error(transparent)]
    Map(#[from] MapError),
}
