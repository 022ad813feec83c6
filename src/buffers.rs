//! Device buffer set and host shadows
//!
//! Owns every device allocation for one run: the immutable matrix
//! buffers, the static y vector, the two ping-pong vector buffers, and
//! the temporary globals. The "input" and "output" roles are integer
//! indices into the fixed two-element ping-pong array; a role swap
//! exchanges the indices, never the underlying allocations or their
//! contents (O(1) per iteration regardless of vector size).
//!
//! Host shadows mirror the ping-pong pair for staging and readback and
//! swap through the same indices, so the shadow labeled "input" always
//! corresponds to the device buffer labeled "input".

use crate::args::ArgContainer;
use crate::backend::{BufferId, BufferUsage, ComputeBackend};
use crate::error::Result;
use crate::layout::{ArgLayout, ArgRole};
use crate::scalar::Scalar;

/// All device-resident state for one run, plus host shadow buffers
#[derive(Debug)]
pub struct DeviceBufferSet {
    matrix_idxs: BufferId,
    matrix_vals: BufferId,
    y_vect: BufferId,
    ping_pong: [BufferId; 2],
    input_role: usize,
    output_role: usize,
    temp_globals: Vec<BufferId>,
    shadows: [Vec<u8>; 2],
    snapshot: Vec<u8>,
}

impl DeviceBufferSet {
    /// Allocate every device buffer, upload initial contents, and walk
    /// the layout table to bind all kernel argument slots
    ///
    /// Matrix buffers are read-only and uploaded exactly once; the
    /// ping-pong pair and temporaries are read-write. Temporaries start
    /// zero-filled. Local scratch is bound by size only.
    ///
    /// # Errors
    ///
    /// Any device allocation, upload or binding failure escalates.
    pub fn allocate<B: ComputeBackend, T: Scalar>(
        backend: &mut B,
        args: &ArgContainer<T>,
        layout: &ArgLayout,
    ) -> Result<Self> {
        let matrix_idxs = backend.alloc(args.matrix_idxs.len(), BufferUsage::ReadOnly)?;
        backend.upload(matrix_idxs, &args.matrix_idxs)?;
        let matrix_vals = backend.alloc(args.matrix_vals.len(), BufferUsage::ReadOnly)?;
        backend.upload(matrix_vals, &args.matrix_vals)?;

        let x_vect = backend.alloc(args.x_vect.len(), BufferUsage::ReadWrite)?;
        backend.upload(x_vect, &args.x_vect)?;
        let y_vect = backend.alloc(args.y_vect.len(), BufferUsage::ReadWrite)?;
        backend.upload(y_vect, &args.y_vect)?;
        let output = backend.alloc(args.output_len, BufferUsage::ReadWrite)?;
        backend.fill_zero(output, args.output_len)?;

        let mut temp_globals = Vec::with_capacity(args.temp_globals.len());
        for &len in &args.temp_globals {
            let buf = backend.alloc(len, BufferUsage::ReadWrite)?;
            backend.fill_zero(buf, len)?;
            temp_globals.push(buf);
        }

        let set = Self {
            matrix_idxs,
            matrix_vals,
            y_vect,
            ping_pong: [x_vect, output],
            input_role: 0,
            output_role: 1,
            temp_globals,
            shadows: [args.x_vect.clone(), vec![0u8; args.output_len]],
            snapshot: vec![0u8; args.output_len],
        };
        set.bind_all(backend, args, layout)?;
        Ok(set)
    }

    /// Bind every slot of the layout table
    fn bind_all<B: ComputeBackend, T: Scalar>(
        &self,
        backend: &mut B,
        args: &ArgContainer<T>,
        layout: &ArgLayout,
    ) -> Result<()> {
        let mut scalar_buf = vec![0u8; T::WIDTH];
        for slot in layout.slots() {
            match slot.role {
                ArgRole::MatrixIndices => backend.bind_buffer(slot.index, self.matrix_idxs)?,
                ArgRole::MatrixValues => backend.bind_buffer(slot.index, self.matrix_vals)?,
                ArgRole::InputVector => {
                    backend.bind_buffer(slot.index, self.ping_pong[self.input_role])?;
                }
                ArgRole::YVector => backend.bind_buffer(slot.index, self.y_vect)?,
                ArgRole::Alpha => {
                    args.alpha.write_le(&mut scalar_buf);
                    backend.bind_scalar(slot.index, &scalar_buf)?;
                }
                ArgRole::Beta => {
                    args.beta.write_le(&mut scalar_buf);
                    backend.bind_scalar(slot.index, &scalar_buf)?;
                }
                ArgRole::Output => {
                    backend.bind_buffer(slot.index, self.ping_pong[self.output_role])?;
                }
                ArgRole::TempGlobal(i) => backend.bind_buffer(slot.index, self.temp_globals[i])?,
                ArgRole::TempLocal(i) => backend.bind_local(slot.index, args.temp_locals[i])?,
                ArgRole::SizeParam(i) => {
                    backend.bind_scalar(slot.index, &args.size_args[i].to_le_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Restore the buffer set to its generator-produced initial state
    ///
    /// Re-uploads the vector buffers, zeros the output buffer and the
    /// temporaries, resets the role indices, restores the host shadows,
    /// and rebinds the two ping-pong slots. The matrix buffers are
    /// immutable for the run's lifetime and are not touched.
    ///
    /// # Errors
    ///
    /// Any device upload, fill or binding failure escalates.
    pub fn reset<B: ComputeBackend, T: Scalar>(
        &mut self,
        backend: &mut B,
        args: &ArgContainer<T>,
        layout: &ArgLayout,
    ) -> Result<()> {
        self.input_role = 0;
        self.output_role = 1;
        backend.upload(self.ping_pong[0], &args.x_vect)?;
        backend.upload(self.y_vect, &args.y_vect)?;
        backend.fill_zero(self.ping_pong[1], args.output_len)?;

        self.shadows[0].copy_from_slice(&args.x_vect);
        self.shadows[1].fill(0);
        self.snapshot.fill(0);

        self.rebind_io(backend, layout)?;
        self.reset_temp_buffers(backend, args)
    }

    /// Overwrite every temporary global buffer with zero bytes
    ///
    /// Called before each launch so speculative temporary state from a
    /// prior iteration never leaks into the next one.
    ///
    /// # Errors
    ///
    /// Any device fill failure escalates.
    pub fn reset_temp_buffers<B: ComputeBackend, T: Scalar>(
        &self,
        backend: &mut B,
        args: &ArgContainer<T>,
    ) -> Result<()> {
        for (&buf, &len) in self.temp_globals.iter().zip(&args.temp_globals) {
            backend.fill_zero(buf, len)?;
        }
        Ok(())
    }

    /// Exchange the input and output role indices
    ///
    /// Identity swap only; buffer contents are untouched. Cyclic with
    /// period 2.
    pub fn swap_roles(&mut self) {
        std::mem::swap(&mut self.input_role, &mut self.output_role);
    }

    /// Rebind the two ping-pong argument slots to the current roles
    ///
    /// # Errors
    ///
    /// Any binding failure escalates.
    pub fn rebind_io<B: ComputeBackend>(
        &self,
        backend: &mut B,
        layout: &ArgLayout,
    ) -> Result<()> {
        backend.bind_buffer(layout.input_slot(), self.ping_pong[self.input_role])?;
        backend.bind_buffer(layout.output_slot(), self.ping_pong[self.output_role])
    }

    /// Download the device output buffer into its host shadow
    ///
    /// # Errors
    ///
    /// Any device transfer failure escalates.
    pub fn download_output<B: ComputeBackend>(&mut self, backend: &mut B) -> Result<()> {
        let role = self.output_role;
        backend.download(self.ping_pong[role], &mut self.shadows[role])
    }

    /// Snapshot the output shadow for change diagnostics
    pub fn snapshot_output(&mut self) {
        self.snapshot.copy_from_slice(&self.shadows[self.output_role]);
    }

    /// True when the output shadow still matches the last snapshot
    ///
    /// Diagnostic only; an unchanged output usually means the kernel
    /// wrote nothing, which is distinct from convergence.
    #[must_use]
    pub fn output_unchanged(&self) -> bool {
        self.shadows[self.output_role] == self.snapshot
    }

    /// Host shadow currently holding the input role
    #[must_use]
    pub fn input_shadow(&self) -> &[u8] {
        &self.shadows[self.input_role]
    }

    /// Host shadow currently holding the output role
    #[must_use]
    pub fn output_shadow(&self) -> &[u8] {
        &self.shadows[self.output_role]
    }

    /// Device handle currently holding the input role
    #[must_use]
    pub fn input_buffer(&self) -> BufferId {
        self.ping_pong[self.input_role]
    }

    /// Device handle currently holding the output role
    #[must_use]
    pub fn output_buffer(&self) -> BufferId {
        self.ping_pong[self.output_role]
    }

    /// Handles of the temporary global buffers, for test inspection
    #[must_use]
    pub fn temp_buffers(&self) -> &[BufferId] {
        &self.temp_globals
    }
}
