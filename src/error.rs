//! Error types for the medir benchmarking harness
//!
//! Every device call returns an explicit `Result`; there is no shared
//! error state mutated across calls. Device-API failures are fatal for
//! the current run and are never retried. Correctness mismatches are
//! *data* (see [`crate::verify::Correctness`]), never errors.

use thiserror::Error;

/// Errors produced by the benchmarking harness
#[derive(Debug, Error)]
pub enum MedirError {
    /// Device-API failure (allocation, upload, download, fill)
    #[error("device error: {reason}")]
    Device {
        /// Human-readable failure description
        reason: String,
    },

    /// Kernel launch or completion-wait failure
    #[error("kernel launch failed: {reason}")]
    Launch {
        /// Human-readable failure description
        reason: String,
    },

    /// Argument binding referenced a slot or buffer that does not exist
    #[error("invalid binding at slot {slot}: {reason}")]
    InvalidBinding {
        /// Kernel argument slot index
        slot: u32,
        /// Human-readable failure description
        reason: String,
    },

    /// Harness or argument-container configuration is unusable
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Human-readable failure description
        reason: String,
    },

    /// The iteration ceiling was reached before the output stabilized
    #[error("run did not converge after {iterations} iterations")]
    DidNotConverge {
        /// Number of kernel launches performed before giving up
        iterations: u32,
    },

    /// Operation not supported by the active backend
    #[error("unsupported operation: {reason}")]
    UnsupportedOperation {
        /// Human-readable failure description
        reason: String,
    },
}

/// Result type alias using [`MedirError`]
pub type Result<T> = std::result::Result<T, MedirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MedirError::Device {
            reason: "out of memory".to_string(),
        };
        assert_eq!(err.to_string(), "device error: out of memory");

        let err = MedirError::DidNotConverge { iterations: 42 };
        assert_eq!(err.to_string(), "run did not converge after 42 iterations");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MedirError>();
    }
}
