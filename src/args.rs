//! Argument container for one benchmarked kernel
//!
//! Holds everything the kernel consumes: the encoded sparse matrix, the
//! two semiring input vectors, the scalar coefficients, temporary-buffer
//! byte sizes, and integer size parameters. Built once per program run by
//! the matrix-encoding and vector-generation collaborators; read-only
//! afterwards except for the vectors, which are re-uploaded on a reset.

use crate::error::{MedirError, Result};
use crate::scalar::{encode_slice, Scalar};

/// Inputs for one benchmarked kernel invocation
///
/// The matrix arrays are pre-encoded bytes in whatever layout the opaque
/// kernel expects; the harness never interprets them. The vectors are
/// kept both as the generator produced them (here) and as device-side
/// copies (in the buffer set) so a reset can restore the initial state.
#[derive(Debug, Clone)]
pub struct ArgContainer<T: Scalar> {
    /// Encoded matrix index array
    pub matrix_idxs: Vec<u8>,
    /// Encoded matrix value array
    pub matrix_vals: Vec<u8>,
    /// First semiring input vector (the ping-pong "input" at reset)
    pub x_vect: Vec<u8>,
    /// Second semiring input vector (static across iterations)
    pub y_vect: Vec<u8>,
    /// Scalar coefficient alpha
    pub alpha: T,
    /// Scalar coefficient beta
    pub beta: T,
    /// Output buffer size in bytes (the ping-pong "output" at reset)
    pub output_len: usize,
    /// Byte sizes of temporary device-global buffers (re-zeroed per iteration)
    pub temp_globals: Vec<usize>,
    /// Byte sizes of temporary device-local (scratch) buffers, bound by size only
    pub temp_locals: Vec<usize>,
    /// Integer size parameters passed by value
    pub size_args: Vec<u32>,
}

impl<T: Scalar> ArgContainer<T> {
    /// Create a container from pre-encoded matrix arrays
    ///
    /// Vectors, scalars and temporaries start empty; chain the `with_`
    /// builders to populate them.
    #[must_use]
    pub fn new(matrix_idxs: Vec<u8>, matrix_vals: Vec<u8>) -> Self {
        Self {
            matrix_idxs,
            matrix_vals,
            x_vect: Vec::new(),
            y_vect: Vec::new(),
            alpha: T::zero(),
            beta: T::zero(),
            output_len: 0,
            temp_globals: Vec::new(),
            temp_locals: Vec::new(),
            size_args: Vec::new(),
        }
    }

    /// Set the two semiring input vectors from element slices
    ///
    /// The output length defaults to the byte length of `x`, which is the
    /// ping-pong invariant the executor relies on.
    #[must_use]
    pub fn with_vectors(mut self, x: &[T], y: &[T]) -> Self {
        self.x_vect = encode_slice(x);
        self.y_vect = encode_slice(y);
        self.output_len = self.x_vect.len();
        self
    }

    /// Set the scalar coefficients
    #[must_use]
    pub fn with_scalars(mut self, alpha: T, beta: T) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    /// Set the temporary device-global buffer sizes (bytes)
    #[must_use]
    pub fn with_temp_globals(mut self, sizes: Vec<usize>) -> Self {
        self.temp_globals = sizes;
        self
    }

    /// Set the temporary device-local buffer sizes (bytes)
    #[must_use]
    pub fn with_temp_locals(mut self, sizes: Vec<usize>) -> Self {
        self.temp_locals = sizes;
        self
    }

    /// Set the integer size parameters
    #[must_use]
    pub fn with_size_args(mut self, sizes: Vec<u32>) -> Self {
        self.size_args = sizes;
        self
    }

    /// Number of elements in the x vector
    #[must_use]
    pub fn vector_elems(&self) -> usize {
        self.x_vect.len() / T::WIDTH
    }

    /// Check the container invariants the executor depends on
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the x vector is empty, is not a
    /// whole number of elements, or does not match the output length
    /// (ping-pong buffers must be interchangeable).
    pub fn validate(&self) -> Result<()> {
        if self.x_vect.is_empty() {
            return Err(MedirError::InvalidConfiguration {
                reason: "x vector is empty".to_string(),
            });
        }
        if self.x_vect.len() % T::WIDTH != 0 {
            return Err(MedirError::InvalidConfiguration {
                reason: format!(
                    "x vector length {} is not a multiple of element width {}",
                    self.x_vect.len(),
                    T::WIDTH
                ),
            });
        }
        if self.output_len != self.x_vect.len() {
            return Err(MedirError::InvalidConfiguration {
                reason: format!(
                    "output length {} must equal x vector length {} for role swapping",
                    self.output_len,
                    self.x_vect.len()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let args = ArgContainer::new(vec![0u8; 8], vec![0u8; 8])
            .with_vectors(&[1i32, 0, 0], &[0i32, 0, 0])
            .with_scalars(1, 0)
            .with_temp_globals(vec![64])
            .with_temp_locals(vec![32])
            .with_size_args(vec![3]);

        assert_eq!(args.x_vect.len(), 12);
        assert_eq!(args.output_len, 12);
        assert_eq!(args.vector_elems(), 3);
        assert_eq!(args.alpha, 1);
        assert_eq!(args.size_args, vec![3]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_x() {
        let args = ArgContainer::<i32>::new(Vec::new(), Vec::new());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_output_len() {
        let mut args =
            ArgContainer::new(Vec::new(), Vec::new()).with_vectors(&[1i32, 2], &[0i32, 0]);
        args.output_len = 4;
        assert!(args.validate().is_err());
    }
}
