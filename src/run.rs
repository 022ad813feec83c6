//! Work-shape descriptor for one benchmarked configuration
//!
//! A [`Run`] fixes the 3-dimensional global and local (work-group) sizes
//! used for every kernel launch of one benchmarked configuration. It is
//! immutable once constructed; one `Run` per configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One work-shape configuration to benchmark
///
/// Unused dimensions are 1, so a one-dimensional launch over 1024 items
/// with work-groups of 128 is `Run::linear(1024, 128)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Global work size per dimension
    pub global: [usize; 3],
    /// Local (work-group) size per dimension
    pub local: [usize; 3],
}

impl Run {
    /// Create a run with explicit 3-dimensional global and local sizes
    #[must_use]
    pub fn new(global: [usize; 3], local: [usize; 3]) -> Self {
        Self { global, local }
    }

    /// Create a one-dimensional run; the remaining dimensions are 1
    #[must_use]
    pub fn linear(global: usize, local: usize) -> Self {
        Self {
            global: [global, 1, 1],
            local: [local, 1, 1],
        }
    }

    /// Total number of global work items
    #[must_use]
    pub fn work_items(&self) -> usize {
        self.global.iter().product()
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}/{}x{}x{}",
            self.global[0],
            self.global[1],
            self.global[2],
            self.local[0],
            self.local[1],
            self.local[2]
        )
    }
}
