//! Host reference backend
//!
//! In-process implementation of [`ComputeBackend`] that stores "device"
//! buffers in host memory and executes a caller-supplied [`HostKernel`]
//! for each launch. Launches are timed with `std::time::Instant`.
//!
//! This backend exists so the full executor state machine (binding,
//! ping-pong role swaps, temp zeroing, convergence) can be exercised in
//! tests and demos without accelerator hardware, mirroring how the CUDA
//! backend behaves.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::backend::{BufferId, BufferUsage, ComputeBackend, LaunchStatus};
use crate::error::{MedirError, Result};
use crate::run::Run;

enum HostBinding {
    Global(BufferId),
    Scalar(Vec<u8>),
    Local(usize),
}

/// Argument view handed to a [`HostKernel`] for one launch
///
/// Buffers are addressed by the same positional slots the argument
/// layout binds. Reads return owned copies so a kernel can freely mix
/// reads with an in-place mutable borrow of its output slot.
pub struct LaunchContext<'a> {
    run: &'a Run,
    bindings: &'a BTreeMap<u32, HostBinding>,
    buffers: &'a mut [Vec<u8>],
    locals: &'a mut BTreeMap<u32, Vec<u8>>,
}

impl LaunchContext<'_> {
    /// The work shape of this launch
    #[must_use]
    pub fn run(&self) -> &Run {
        self.run
    }

    fn global_id(&self, slot: u32) -> Result<BufferId> {
        match self.bindings.get(&slot) {
            Some(HostBinding::Global(id)) => Ok(*id),
            Some(_) => Err(MedirError::InvalidBinding {
                slot,
                reason: "slot is not a global buffer".to_string(),
            }),
            None => Err(MedirError::InvalidBinding {
                slot,
                reason: "slot is unbound".to_string(),
            }),
        }
    }

    /// Copy of the bytes of the global buffer bound at `slot`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinding` if the slot is unbound or not a buffer.
    pub fn read_global(&self, slot: u32) -> Result<Vec<u8>> {
        let id = self.global_id(slot)?;
        Ok(self.buffers[id.0].clone())
    }

    /// Mutable view of the global buffer bound at `slot`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinding` if the slot is unbound or not a buffer.
    pub fn global_mut(&mut self, slot: u32) -> Result<&mut [u8]> {
        let id = self.global_id(slot)?;
        Ok(&mut self.buffers[id.0])
    }

    /// Little-endian bytes of the by-value argument bound at `slot`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinding` if the slot is unbound or not a scalar.
    pub fn scalar(&self, slot: u32) -> Result<Vec<u8>> {
        match self.bindings.get(&slot) {
            Some(HostBinding::Scalar(bytes)) => Ok(bytes.clone()),
            Some(_) => Err(MedirError::InvalidBinding {
                slot,
                reason: "slot is not a by-value argument".to_string(),
            }),
            None => Err(MedirError::InvalidBinding {
                slot,
                reason: "slot is unbound".to_string(),
            }),
        }
    }

    /// Local scratch bound at `slot`; zero-initialized for every launch
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinding` if the slot is unbound or not a local.
    pub fn local_mut(&mut self, slot: u32) -> Result<&mut [u8]> {
        self.locals
            .get_mut(&slot)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| MedirError::InvalidBinding {
                slot,
                reason: "slot is not local scratch".to_string(),
            })
    }
}

/// An opaque compute kernel executed by the host backend
///
/// Implemented by closures too: any
/// `FnMut(&mut LaunchContext<'_>) -> Result<()>` is a `HostKernel`.
pub trait HostKernel: Send {
    /// Execute one launch over the bound arguments
    ///
    /// # Errors
    ///
    /// Any error is treated as a fatal launch failure by the backend.
    fn execute(&mut self, ctx: &mut LaunchContext<'_>) -> Result<()>;
}

impl<F> HostKernel for F
where
    F: FnMut(&mut LaunchContext<'_>) -> Result<()> + Send,
{
    fn execute(&mut self, ctx: &mut LaunchContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Host-memory [`ComputeBackend`] executing a registered [`HostKernel`]
pub struct HostBackend {
    name: String,
    kernel: Box<dyn HostKernel>,
    buffers: Vec<Vec<u8>>,
    usages: Vec<BufferUsage>,
    written: Vec<bool>,
    bindings: BTreeMap<u32, HostBinding>,
    last_status: LaunchStatus,
}

impl HostBackend {
    /// Create a backend around a kernel
    pub fn new(kernel: impl HostKernel + 'static) -> Self {
        Self {
            name: "host reference device".to_string(),
            kernel: Box::new(kernel),
            buffers: Vec::new(),
            usages: Vec::new(),
            written: Vec::new(),
            bindings: BTreeMap::new(),
            last_status: LaunchStatus::Complete,
        }
    }

    /// Override the reported device name
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Bytes currently held by a buffer, for test inspection
    #[must_use]
    pub fn buffer_bytes(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.0).map(Vec::as_slice)
    }

    fn check_id(&self, buffer: BufferId) -> Result<()> {
        if buffer.0 < self.buffers.len() {
            Ok(())
        } else {
            Err(MedirError::Device {
                reason: format!("unknown buffer handle {}", buffer.0),
            })
        }
    }
}

impl ComputeBackend for HostBackend {
    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn alloc(&mut self, len: usize, usage: BufferUsage) -> Result<BufferId> {
        let id = BufferId(self.buffers.len());
        self.buffers.push(vec![0u8; len]);
        self.usages.push(usage);
        self.written.push(false);
        Ok(id)
    }

    fn upload(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        self.check_id(buffer)?;
        if self.usages[buffer.0] == BufferUsage::ReadOnly && self.written[buffer.0] {
            return Err(MedirError::Device {
                reason: format!("buffer {} is read-only after its initial upload", buffer.0),
            });
        }
        self.written[buffer.0] = true;
        let dst = &mut self.buffers[buffer.0];
        if data.len() > dst.len() {
            return Err(MedirError::Device {
                reason: format!(
                    "upload of {} bytes into {}-byte buffer",
                    data.len(),
                    dst.len()
                ),
            });
        }
        dst[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn download(&mut self, buffer: BufferId, out: &mut [u8]) -> Result<()> {
        self.check_id(buffer)?;
        let src = &self.buffers[buffer.0];
        if out.len() > src.len() {
            return Err(MedirError::Device {
                reason: format!(
                    "download of {} bytes from {}-byte buffer",
                    out.len(),
                    src.len()
                ),
            });
        }
        out.copy_from_slice(&src[..out.len()]);
        Ok(())
    }

    fn fill_zero(&mut self, buffer: BufferId, len: usize) -> Result<()> {
        self.check_id(buffer)?;
        let dst = &mut self.buffers[buffer.0];
        let len = len.min(dst.len());
        dst[..len].fill(0);
        Ok(())
    }

    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        self.check_id(buffer).map_err(|_| MedirError::InvalidBinding {
            slot,
            reason: format!("unknown buffer handle {}", buffer.0),
        })?;
        self.bindings.insert(slot, HostBinding::Global(buffer));
        Ok(())
    }

    fn bind_scalar(&mut self, slot: u32, bytes: &[u8]) -> Result<()> {
        self.bindings
            .insert(slot, HostBinding::Scalar(bytes.to_vec()));
        Ok(())
    }

    fn bind_local(&mut self, slot: u32, len: usize) -> Result<()> {
        self.bindings.insert(slot, HostBinding::Local(len));
        Ok(())
    }

    fn launch(&mut self, run: &Run) -> Result<Duration> {
        // Local scratch is undefined across launches on real devices;
        // hand the kernel a fresh zeroed copy each time.
        let mut locals: BTreeMap<u32, Vec<u8>> = self
            .bindings
            .iter()
            .filter_map(|(slot, binding)| match binding {
                HostBinding::Local(len) => Some((*slot, vec![0u8; *len])),
                _ => None,
            })
            .collect();

        let mut ctx = LaunchContext {
            run,
            bindings: &self.bindings,
            buffers: &mut self.buffers,
            locals: &mut locals,
        };

        let start = Instant::now();
        let outcome = self.kernel.execute(&mut ctx);
        let elapsed = start.elapsed();

        match outcome {
            Ok(()) => {
                self.last_status = LaunchStatus::Complete;
                Ok(elapsed)
            }
            Err(e) => {
                self.last_status = LaunchStatus::Other(-1);
                Err(MedirError::Launch {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn last_launch_status(&self) -> LaunchStatus {
        self.last_status
    }
}
