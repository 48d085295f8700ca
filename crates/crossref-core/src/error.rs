//! Error types shared by the extraction crates.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building target sets or installing metrics.
#[derive(Error, Debug)]
pub enum Error {
    /// A target list line could not be used as a journal name.
    #[error("invalid target on line {line}: {reason}")]
    InvalidTarget {
        /// 1-based line number in the target list.
        line: usize,
        /// Description of what's wrong.
        reason: String,
    },

    /// The Prometheus exporter could not be installed.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_display() {
        let err = Error::InvalidTarget {
            line: 7,
            reason: "name is empty".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("name is empty"));
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
