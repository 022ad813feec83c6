//! Semiring element codec
//!
//! Host shadow buffers are raw bytes; the harness only reinterprets them
//! at the seams (termination check, correctness check). The [`Scalar`]
//! trait is that seam: a fixed-width little-endian codec over the element
//! types the semiring kernels actually use.

use std::fmt;

/// A fixed-width semiring element that can round-trip through byte buffers
pub trait Scalar:
    Copy + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Element width in bytes
    const WIDTH: usize;

    /// Write this value into the first `WIDTH` bytes of `out` (little-endian)
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than `WIDTH`.
    fn write_le(self, out: &mut [u8]);

    /// Read a value from the first `WIDTH` bytes of `bytes` (little-endian)
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `WIDTH`.
    fn read_le(bytes: &[u8]) -> Self;

    /// The additive identity
    fn zero() -> Self;

    /// Lossy widening conversion, used for tolerance comparisons
    fn to_f64(self) -> f64;
}

macro_rules! impl_scalar {
    ($ty:ty, $width:expr) => {
        impl Scalar for $ty {
            const WIDTH: usize = $width;

            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $width];
                raw.copy_from_slice(&bytes[..Self::WIDTH]);
                Self::from_le_bytes(raw)
            }

            fn zero() -> Self {
                0 as $ty
            }

            #[allow(clippy::cast_lossless)]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_scalar!(i32, 4);
impl_scalar!(u32, 4);
impl_scalar!(i64, 8);
impl_scalar!(f32, 4);
impl_scalar!(f64, 8);

/// Encode a slice of elements into a little-endian byte vector
#[must_use]
pub fn encode_slice<T: Scalar>(values: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * T::WIDTH];
    for (value, chunk) in values.iter().zip(bytes.chunks_exact_mut(T::WIDTH)) {
        value.write_le(chunk);
    }
    bytes
}

/// Decode a byte buffer into elements; a trailing partial element is ignored
#[must_use]
pub fn decode_slice<T: Scalar>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::WIDTH).map(T::read_le).collect()
}
