//! tach-map Library
//!
//! Ordered string map used for test metadata, configuration variables and
//! environment mappings, plus the thin layers that load and report them.
//! The binary entry point is in main.rs.

pub mod config;
pub mod environment;
pub mod error;
pub mod map;
pub mod reporter;
pub mod vars;

pub use error::{MapError, VarError};
pub use map::{Cursor, StrMap, Value};
pub use vars::Vars;
