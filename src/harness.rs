//! Iterative executor and trial aggregator
//!
//! Drives one opaque kernel to convergence: reset, launch, download,
//! check termination, swap ping-pong roles, repeat. One logical thread
//! issues every device operation and waits on it before proceeding, so
//! the just-downloaded output is fully materialized on the host before
//! the termination check reads it.
//!
//! Per-iteration work is O(1) beyond the kernel itself: the role swap
//! exchanges two indices and rebinds two argument slots, never copying
//! vector contents. Iteration counts are data-dependent, so a
//! configurable ceiling turns a non-converging kernel into an explicit
//! [`MedirError::DidNotConverge`] instead of a silent infinite loop.

use std::marker::PhantomData;
use std::time::Duration;

use crate::args::ArgContainer;
use crate::backend::{ComputeBackend, LaunchStatus};
use crate::buffers::DeviceBufferSet;
use crate::error::{MedirError, Result};
use crate::layout::ArgLayout;
use crate::run::Run;
use crate::scalar::Scalar;
use crate::stats::{median_duration, total_duration, TimingRecord};
use crate::verbose;
use crate::verify::{check_result, Correctness};

/// How the termination check compares the input and output shadows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Bitwise element equality; right for integer-valued propagation
    Exact,
    /// |a - b| < delta per element; right for floating-point semirings
    WithinDelta,
}

/// Harness configuration, immutable once the harness is constructed
#[derive(Debug, Clone, Copy)]
pub struct HarnessConfig {
    /// Number of independent trials per run
    pub trials: u32,
    /// Initial watchdog budget; only ever lowered, never enforced here
    pub timeout: Duration,
    /// Per-element tolerance for [`CompareMode::WithinDelta`]
    pub delta: f64,
    /// Comparison mode for the termination check
    pub compare: CompareMode,
    /// Launches per trial before giving up with `DidNotConverge`
    pub max_iterations: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trials: 3,
            timeout: Duration::from_secs(60),
            delta: 0.0,
            compare: CompareMode::Exact,
            max_iterations: 1_000_000,
        }
    }
}

impl HarnessConfig {
    /// Set the trial count
    #[must_use]
    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    /// Set the initial watchdog budget
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use tolerance-based termination with the given per-element delta
    #[must_use]
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self.compare = CompareMode::WithinDelta;
        self
    }

    /// Set the iteration ceiling
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Termination predicate over the two host shadow byte buffers
///
/// Implementations must be pure functions of the two buffers' current
/// contents; the executor relies on the verdict being independent of
/// any other state.
pub trait TerminationCheck: Send {
    /// True when every paired element up to the shorter buffer matches
    fn should_terminate(&self, input: &[u8], output: &[u8]) -> bool;
}

/// Bitwise fixed-point termination: element-width chunks must be equal
#[derive(Debug, Default)]
pub struct FixedPoint<T: Scalar> {
    _marker: PhantomData<T>,
}

impl<T: Scalar> FixedPoint<T> {
    /// Create the check
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Scalar> TerminationCheck for FixedPoint<T> {
    fn should_terminate(&self, input: &[u8], output: &[u8]) -> bool {
        input
            .chunks_exact(T::WIDTH)
            .zip(output.chunks_exact(T::WIDTH))
            .all(|(a, b)| a == b)
    }
}

/// Tolerance termination: |a - b| < delta per paired element
#[derive(Debug)]
pub struct WithinDelta<T: Scalar> {
    delta: f64,
    _marker: PhantomData<T>,
}

impl<T: Scalar> WithinDelta<T> {
    /// Create the check with a per-element tolerance
    #[must_use]
    pub fn new(delta: f64) -> Self {
        Self {
            delta,
            _marker: PhantomData,
        }
    }
}

impl<T: Scalar> TerminationCheck for WithinDelta<T> {
    fn should_terminate(&self, input: &[u8], output: &[u8]) -> bool {
        input
            .chunks_exact(T::WIDTH)
            .zip(output.chunks_exact(T::WIDTH))
            .all(|(a, b)| {
                let a = T::read_le(a).to_f64();
                let b = T::read_le(b).to_f64();
                (a - b).abs() < self.delta
            })
    }
}

/// Benchmarking harness for one kernel on one device
///
/// Owns the backend, the argument container, the layout table, and the
/// device buffer set for the lifetime of the benchmark. No two runs
/// execute concurrently against the same harness.
pub struct Harness<B: ComputeBackend, T: Scalar> {
    backend: B,
    args: ArgContainer<T>,
    layout: ArgLayout,
    buffers: DeviceBufferSet,
    config: HarnessConfig,
    termination: Box<dyn TerminationCheck>,
    timeout: Duration,
}

impl<B: ComputeBackend, T: Scalar> std::fmt::Debug for Harness<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<B: ComputeBackend, T: Scalar> Harness<B, T> {
    /// Allocate device buffers, bind all arguments, and build the
    /// termination check from the configured comparison mode
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an unusable argument
    /// container, or any device error from allocation and binding.
    pub fn new(mut backend: B, args: ArgContainer<T>, config: HarnessConfig) -> Result<Self> {
        args.validate()?;
        if config.trials == 0 {
            return Err(MedirError::InvalidConfiguration {
                reason: "trial count must be at least 1".to_string(),
            });
        }
        let layout = ArgLayout::from_args(&args);
        let buffers = DeviceBufferSet::allocate(&mut backend, &args, &layout)?;
        let termination: Box<dyn TerminationCheck> = match config.compare {
            CompareMode::Exact => Box::new(FixedPoint::<T>::new()),
            CompareMode::WithinDelta => Box::new(WithinDelta::<T>::new(config.delta)),
        };
        Ok(Self {
            backend,
            args,
            layout,
            buffers,
            config,
            termination,
            timeout: config.timeout,
        })
    }

    /// Benchmark one run: T trials, each iterated to convergence
    ///
    /// Returns one record sequence per trial: the raw per-iteration
    /// timings in launch order followed by the synthetic median and sum
    /// records. The correctness verdict for the trial's final output is
    /// attached to the synthetic records.
    ///
    /// # Errors
    ///
    /// Device failures and non-convergence escalate; no partial results
    /// are returned in that case.
    pub fn benchmark(&mut self, run: &Run, gold: &[T]) -> Result<Vec<Vec<TimingRecord>>> {
        let mut trials = Vec::with_capacity(self.config.trials as usize);
        for trial in 0..self.config.trials {
            self.buffers
                .reset(&mut self.backend, &self.args, &self.layout)?;
            let mut records = self.execute_run(run, trial)?;

            let verdict = check_result(self.buffers.output_shadow(), gold);
            let median = median_duration(&records);
            let total = total_duration(&records);
            records.push(TimingRecord::median(median, verdict, run, trial));
            records.push(TimingRecord::trial_sum(total, verdict, run, trial));

            self.lower_timeout(total);
            trials.push(records);
        }
        Ok(trials)
    }

    /// One trial: iterate until the output stabilizes
    fn execute_run(&mut self, run: &Run, trial: u32) -> Result<Vec<TimingRecord>> {
        let mut records = Vec::new();
        let mut iteration: u32 = 0;
        loop {
            self.buffers.snapshot_output();
            self.buffers
                .reset_temp_buffers(&mut self.backend, &self.args)?;

            let elapsed = self.backend.launch(run)?;
            match self.backend.last_launch_status() {
                LaunchStatus::Complete => {}
                status => eprintln!("launch finished with non-complete status {status:?}"),
            }
            records.push(TimingRecord::raw(elapsed, run, trial, iteration));

            self.buffers.download_output(&mut self.backend)?;
            if verbose() && self.buffers.output_unchanged() {
                eprintln!("iteration {iteration}: output buffer unchanged by kernel");
            }

            if self
                .termination
                .should_terminate(self.buffers.input_shadow(), self.buffers.output_shadow())
            {
                return Ok(records);
            }

            self.buffers.swap_roles();
            self.buffers.rebind_io(&mut self.backend, &self.layout)?;

            iteration += 1;
            if iteration >= self.config.max_iterations {
                return Err(MedirError::DidNotConverge { iterations: iteration });
            }
        }
    }

    /// Lower the watchdog budget based on a newly observed trial total
    ///
    /// A 2x gap to the budget could still be noise; once a measured
    /// time beats half the budget, the budget shrinks to twice that
    /// measurement. The budget never grows back.
    fn lower_timeout(&mut self, measured: Duration) {
        if measured * 2 < self.timeout {
            self.timeout = measured * 2;
        }
    }

    /// Current (possibly lowered) watchdog budget
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Name of the device backing this harness, for reports
    #[must_use]
    pub fn device_name(&self) -> String {
        self.backend.device_name()
    }

    /// The backend, for test inspection
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
