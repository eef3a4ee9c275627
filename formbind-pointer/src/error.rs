//! Error types for strict pointer parsing

use thiserror::Error;

/// Result type for pointer operations
pub type Result<T> = std::result::Result<T, PointerError>;

/// Errors raised by [`Pointer::parse`](crate::Pointer::parse).
///
/// The lenient accessors (`get_value`, `set_value`, `normalize`) never fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A `~` that is not followed by `0` or `1`
    #[error("invalid escape in pointer '{pointer}' at byte {position}")]
    InvalidEscape { pointer: String, position: usize },
}
