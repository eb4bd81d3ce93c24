/// Core Module
///
/// Shared infrastructure of the legacy data-access layer: database access
/// and error handling.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DataAccessError, DriverError, FailureKind, LegacyError, Result};
