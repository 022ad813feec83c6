//! Compute backend abstraction
//!
//! Abstraction over accelerator backends (host reference, CUDA, future:
//! Metal, HIP). The harness drives the trait; swapping in the host
//! backend exercises all executor logic without hardware.
//!
//! Every operation is blocking: the call does not return until the
//! device work is complete, and each call reports its own `Result`.
//! Loop termination depends on downloaded bytes being fully
//! materialized on the host, so there is no overlap or pipelining.

use std::time::Duration;

use crate::error::Result;
use crate::run::Run;

/// Opaque handle to a backend-owned device buffer
///
/// Handles index into backend-owned storage; exchanging which handle
/// plays the "input" role never moves ownership of the underlying
/// allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) usize);

/// Access pattern for a device allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded once, immutable for the lifetime of the run
    ReadOnly,
    /// Written by the kernel and/or re-uploaded between trials
    ReadWrite,
}

/// Advisory post-launch execution status
///
/// Logged only; a non-complete terminal status never changes control
/// flow because `launch` has already waited for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    /// Command queued, not yet submitted to the device
    Queued,
    /// Submitted to the device
    Submitted,
    /// Currently executing
    Running,
    /// Completed successfully
    Complete,
    /// Any other terminal status, carrying the backend's raw code
    Other(i64),
}

/// Abstraction over accelerator compute backends
///
/// Implementations own the compiled kernel, its device buffers, and its
/// argument bindings. The harness only ever holds [`BufferId`] handles.
pub trait ComputeBackend {
    /// Human-readable device name for reports
    fn device_name(&self) -> String;

    /// Allocate a device buffer of `len` bytes
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::Device`] on allocation failure.
    fn alloc(&mut self, len: usize, usage: BufferUsage) -> Result<BufferId>;

    /// Blocking upload of host bytes into a device buffer
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::Device`] on transfer failure or an
    /// unknown handle.
    fn upload(&mut self, buffer: BufferId, data: &[u8]) -> Result<()>;

    /// Blocking download of a device buffer into `out`
    ///
    /// Reads `out.len()` bytes; the caller sizes the destination.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::Device`] on transfer failure or an
    /// unknown handle.
    fn download(&mut self, buffer: BufferId, out: &mut [u8]) -> Result<()>;

    /// Blocking overwrite of the first `len` bytes of a buffer with zeros
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::Device`] on failure.
    fn fill_zero(&mut self, buffer: BufferId, len: usize) -> Result<()>;

    /// Bind a device buffer to a positional kernel argument slot
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::InvalidBinding`] for unknown handles.
    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()>;

    /// Bind a by-value argument (scalar coefficient or size parameter)
    ///
    /// `bytes` is the little-endian encoding of the value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::InvalidBinding`] on failure.
    fn bind_scalar(&mut self, slot: u32, bytes: &[u8]) -> Result<()>;

    /// Bind device-local scratch of `len` bytes (size only, no host copy)
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::InvalidBinding`] on failure.
    fn bind_local(&mut self, slot: u32, len: usize) -> Result<()>;

    /// Launch the kernel over `run`'s work shape, wait for completion,
    /// and return the device-measured elapsed time
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedirError::Launch`] on any non-success status
    /// from the underlying launch or wait; such failures are fatal for
    /// the benchmark.
    fn launch(&mut self, run: &Run) -> Result<Duration>;

    /// Advisory status of the most recent launch
    fn last_launch_status(&self) -> LaunchStatus;
}
