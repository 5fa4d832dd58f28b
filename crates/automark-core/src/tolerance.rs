//! Element-wise closeness with broadcasting.
//!
//! Two profiles are in use: clients check fixture cases with a relative and an
//! absolute term, while the server grades challenge answers with the absolute
//! term only.

use crate::array::{ArrayError, NdArray};

/// Rounding allowance, in units of `f64::EPSILON` relative to the operands.
///
/// Keeps values written as decimal literals on the tolerance boundary inside it
/// (`1.00001 - 1.0` is a hair above `1e-5` in binary floating point).
const ROUNDING_ULPS: f64 = 4.0;

/// Closeness rule `|actual - expected| <= atol + rtol * |expected|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerance {
    /// Profile used for offline fixture checks.
    pub const LOCAL: Self = Self {
        rtol: 1e-5,
        atol: 1e-5,
    };

    /// Profile used when grading challenge answers.
    pub const REMOTE: Self = Self {
        rtol: 0.0,
        atol: 1e-5,
    };

    pub fn is_close(&self, actual: f64, expected: f64) -> bool {
        if actual.is_nan() || expected.is_nan() {
            return false;
        }
        if actual.is_infinite() || expected.is_infinite() {
            return actual == expected;
        }
        let diff = (actual - expected).abs();
        let slack = ROUNDING_ULPS * f64::EPSILON * actual.abs().max(expected.abs());
        diff <= self.atol + self.rtol * expected.abs() + slack
    }

    /// Whether every element pair is close after broadcasting both arrays to a
    /// common shape.
    pub fn all_close(&self, actual: &NdArray, expected: &NdArray) -> Result<bool, ArrayError> {
        let shape = broadcast_shape(actual.shape(), expected.shape()).ok_or_else(|| {
            ArrayError::Broadcast {
                left: actual.shape().to_vec(),
                right: expected.shape().to_vec(),
            }
        })?;

        let total: usize = shape.iter().product();
        let mut index = vec![0_usize; shape.len()];
        for flat in 0..total {
            unravel(flat, &shape, &mut index);
            let a = actual.data()[source_offset(actual.shape(), &index)];
            let e = expected.data()[source_offset(expected.shape(), &index)];
            if !self.is_close(a, e) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Common shape under trailing-axis broadcasting, `None` when incompatible.
pub fn broadcast_shape(left: &[usize], right: &[usize]) -> Option<Vec<usize>> {
    let ndim = left.len().max(right.len());
    let mut out = vec![0; ndim];
    for k in 0..ndim {
        let l = trailing_dim(left, k);
        let r = trailing_dim(right, k);
        out[ndim - 1 - k] = match (l, r) {
            _ if l == r => l,
            (1, _) => r,
            (_, 1) => l,
            _ => return None,
        };
    }
    Some(out)
}

fn trailing_dim(shape: &[usize], k: usize) -> usize {
    if k < shape.len() {
        shape[shape.len() - 1 - k]
    } else {
        1
    }
}

fn unravel(mut flat: usize, shape: &[usize], index: &mut [usize]) {
    for axis in (0..shape.len()).rev() {
        index[axis] = flat % shape[axis];
        flat /= shape[axis];
    }
}

fn source_offset(src: &[usize], index: &[usize]) -> usize {
    let skip = index.len() - src.len();
    src.iter()
        .zip(&index[skip..])
        .fold(0, |offset, (&dim, &i)| {
            offset * dim + if dim == 1 { 0 } else { i }
        })
}
