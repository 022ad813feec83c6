//! Correctness checking against an optional gold vector
//!
//! The verdict is data in the result stream, never an error: a mismatch
//! does not abort benchmarking. Diagnostic output is capped so a badly
//! broken kernel cannot flood the log.

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Cap on individually logged mismatches per check
pub const MAX_LOGGED_MISMATCHES: usize = 20;

/// Outcome of comparing a device-read output against a gold vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Correctness {
    /// No gold vector was supplied
    NotChecked,
    /// Every gold element matched
    Correct,
    /// The output holds fewer elements than the gold vector
    BadLength,
    /// At least one element differed
    BadValues,
}

/// Compare downloaded output bytes against a gold vector
///
/// An empty gold vector means "no reference" and always yields
/// [`Correctness::NotChecked`]. Mismatches are logged to stderr with
/// expected/actual/index, capped at [`MAX_LOGGED_MISMATCHES`].
#[must_use]
pub fn check_result<T: Scalar>(output: &[u8], gold: &[T]) -> Correctness {
    check_result_logged(output, gold).0
}

/// [`check_result`] variant that also reports how many mismatches were
/// logged before the cap cut the scan off
#[must_use]
pub fn check_result_logged<T: Scalar>(output: &[u8], gold: &[T]) -> (Correctness, usize) {
    if gold.is_empty() {
        return (Correctness::NotChecked, 0);
    }

    let output_elems = output.len() / T::WIDTH;
    if output_elems < gold.len() {
        return (Correctness::BadLength, 0);
    }

    let mut logged = 0;
    for (i, (expected, chunk)) in gold.iter().zip(output.chunks_exact(T::WIDTH)).enumerate() {
        let actual = T::read_le(chunk);
        if actual != *expected {
            eprintln!("expected gold value {expected} at index {i}, found {actual} instead");
            logged += 1;
            if logged == MAX_LOGGED_MISMATCHES {
                break;
            }
        }
    }

    if logged > 0 {
        (Correctness::BadValues, logged)
    } else {
        (Correctness::Correct, 0)
    }
}
