//! # Medir
//!
//! Benchmarking harness for iterative sparse-matrix accelerator kernels
//! (e.g. BFS expressed as repeated sparse matrix-vector semiring
//! products). Medir (Spanish: "to measure") drives an opaque compute
//! kernel through repeated launches until its output stabilizes,
//! collecting per-iteration device timings, per-trial aggregates
//! (median, sum), and an optional gold-vector correctness verdict.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------+
//! |    Harness (trials)      |  <- reset / iterate / aggregate
//! +--------------------------+
//! |  DeviceBufferSet + ArgLayout |  <- ping-pong roles, O(1) rebinding
//! +--------------------------+
//! |    ComputeBackend trait  |  <- host reference | CUDA (feature)
//! +--------------------------+
//! ```
//!
//! ## Example
//!
//! ```rust
//! use medir::{ArgContainer, Harness, HarnessConfig, HostBackend, LaunchContext, Run};
//!
//! // An "accelerator kernel": copies its input vector to its output.
//! let kernel = |ctx: &mut LaunchContext<'_>| {
//!     let input = ctx.read_global(2)?;
//!     ctx.global_mut(6)?.copy_from_slice(&input);
//!     Ok(())
//! };
//!
//! let args = ArgContainer::new(vec![], vec![])
//!     .with_vectors(&[1i32, 0, 0, 0], &[0i32, 0, 0, 0]);
//! let backend = HostBackend::new(kernel);
//! let config = HarnessConfig::default().with_trials(1);
//!
//! let mut harness = Harness::new(backend, args, config).unwrap();
//! let trials = harness.benchmark(&Run::linear(4, 1), &[1i32, 0, 0, 0]).unwrap();
//! // one launch reaches the fixed point: 1 raw record + median + sum
//! assert_eq!(trials[0].len(), 3);
//! ```
//!
//! ## Design invariants
//!
//! - Exactly one buffer holds the "input" role and one the "output"
//!   role at any instant; roles swap *identity*, never contents.
//! - Every temporary global buffer is zeroed before every launch.
//! - Termination is a pure function of the two host shadow buffers.
//! - Device calls return explicit results and are checked immediately.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

use std::sync::OnceLock;

pub mod args;
pub mod backend;
pub mod buffers;
/// CUDA backend via trueno-gpu (optional)
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod error;
pub mod harness;
pub mod host;
pub mod layout;
pub mod run;
pub mod scalar;
pub mod stats;
pub mod verify;

pub use args::ArgContainer;
pub use backend::{BufferId, BufferUsage, ComputeBackend, LaunchStatus};
pub use buffers::DeviceBufferSet;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use error::{MedirError, Result};
pub use harness::{CompareMode, FixedPoint, Harness, HarnessConfig, TerminationCheck, WithinDelta};
pub use host::{HostBackend, HostKernel, LaunchContext};
pub use layout::{ArgLayout, ArgRole, ArgSlot, SlotBinding};
pub use run::Run;
pub use scalar::{decode_slice, encode_slice, Scalar};
pub use stats::{median_duration, total_duration, RecordKind, TimingRecord};
pub use verify::{check_result, check_result_logged, Correctness, MAX_LOGGED_MISMATCHES};

/// Check if verbose mode is enabled (MEDIR_VERBOSE=1)
/// Default is quiet - only warnings and mismatches are printed
pub(crate) fn verbose() -> bool {
    static VERBOSE: OnceLock<bool> = OnceLock::new();
    *VERBOSE.get_or_init(|| std::env::var("MEDIR_VERBOSE").is_ok())
}
