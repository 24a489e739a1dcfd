//! Error types for the heatsep library.
//!
//! ## Key Components
//!
//! - [`SeparatorError`]: Returned by `put`/`get` on a separator (key not
//!   admitted, zero capacity, unimplemented policy, corrupted state).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//! - [`ConfigError`]: Returned when separator configuration is invalid
//!   (missing parameter, out-of-range ratio, malformed JSON).
//!
//! ## Example Usage
//!
//! ```
//! use heatsep::error::ConfigError;
//! use heatsep::policy::s3_fifo::S3FifoSeparator;
//!
//! let ok: Result<S3FifoSeparator<String>, ConfigError> =
//!     S3FifoSeparator::try_with_ratios(100, 0.1, 0.9);
//! assert!(ok.is_ok());
//!
//! let bad = S3FifoSeparator::<String>::try_with_ratios(100, 2.0, 0.9);
//! assert!(bad.is_err());
//! ```

use std::fmt;

use crate::builder::SeparatorKind;

// ---------------------------------------------------------------------------
// SeparatorError
// ---------------------------------------------------------------------------

/// Outcome of a rejected `put`/`get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeparatorError {
    /// `get` on a key the separator never admitted (or already evicted).
    NotFound,
    /// The separator was configured with zero capacity.
    Capacity,
    /// The policy exists as a placeholder only.
    Unimplemented(SeparatorKind),
    /// Internal cross-references disagree.
    Invariant(InvariantError),
}

impl fmt::Display for SeparatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeparatorError::NotFound => f.write_str("key not found"),
            SeparatorError::Capacity => f.write_str("separator has no capacity"),
            SeparatorError::Unimplemented(kind) => {
                write!(f, "{} separator is not implemented", kind.tag())
            }
            SeparatorError::Invariant(err) => write!(f, "invariant violated: {err}"),
        }
    }
}

impl std::error::Error for SeparatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeparatorError::Invariant(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvariantError> for SeparatorError {
    fn from(err: InvariantError) -> Self {
        SeparatorError::Invariant(err)
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal separator invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when separator configuration is invalid.
///
/// Produced by fallible constructors such as
/// [`S3FifoSeparator::try_with_ratios`](crate::policy::s3_fifo::S3FifoSeparator::try_with_ratios)
/// and by the JSON loader in [`config`](crate::config). Errors raised while
/// reading a `heat_separators` entry are prefixed with its position and
/// field, e.g. `heat_separators[2].params.capacity: missing`.
///
/// # Example
///
/// ```
/// use heatsep::error::ConfigError;
///
/// let err = ConfigError::at(1, "threshold", "must be > 0");
/// assert_eq!(err.to_string(), "heat_separators[1].params.threshold: must be > 0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Error for `field` of the separator at position `index`.
    pub fn at(index: usize, field: &str, reason: impl fmt::Display) -> Self {
        Self(format!("heat_separators[{index}].params.{field}: {reason}"))
    }

    /// Prefixes an existing error with the separator position.
    pub fn in_separator(self, index: usize) -> Self {
        if self.0.starts_with("heat_separators[") {
            return self;
        }
        Self(format!("heat_separators[{index}]: {}", self.0))
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self(format!("malformed configuration: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- SeparatorError ---------------------------------------------------

    #[test]
    fn separator_error_display() {
        assert_eq!(SeparatorError::NotFound.to_string(), "key not found");
        assert_eq!(
            SeparatorError::Unimplemented(SeparatorKind::HotRing).to_string(),
            "hotring separator is not implemented"
        );
    }

    #[test]
    fn separator_error_wraps_invariant_source() {
        use std::error::Error;
        let err: SeparatorError = InvariantError::new("queue length mismatch").into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("queue length mismatch"));
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("queue length mismatch");
        assert_eq!(err.to_string(), "queue length mismatch");
        assert_eq!(err.message(), "queue length mismatch");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_at_names_index_and_field() {
        let err = ConfigError::at(3, "capacity", "missing");
        assert_eq!(err.message(), "heat_separators[3].params.capacity: missing");
    }

    #[test]
    fn config_in_separator_prefixes_once() {
        let err = ConfigError::new("epsilon must be in (0, 1], got 2").in_separator(0);
        assert_eq!(
            err.to_string(),
            "heat_separators[0]: epsilon must be in (0, 1], got 2"
        );
        let again = err.clone().in_separator(5);
        assert_eq!(again, err);
    }

    #[test]
    fn config_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::from(json_err);
        assert!(err.message().starts_with("malformed configuration"));
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }
}
