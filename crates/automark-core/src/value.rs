//! Tagged argument values.
//!
//! Wire form is `{"type": "<kind>", "data": <json>}` so the receiver can tell a
//! multi-dimensional array from a plain list or scalar.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::array::{ArrayError, NdArray};

/// One named argument of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ArgValue {
    Scalar(f64),
    List(Vec<Value>),
    NdArray(NdArray),
}

impl ArgValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list",
            Self::NdArray(_) => "ndarray",
        }
    }

    /// Numeric view of the value. Lists must be rectangular and numeric.
    pub fn to_array(&self) -> Result<NdArray, ArrayError> {
        match self {
            Self::Scalar(v) => Ok(NdArray::scalar(*v)),
            Self::List(items) => NdArray::from_json(&Value::Array(items.clone())),
            Self::NdArray(arr) => Ok(arr.clone()),
        }
    }

    pub fn as_ndarray(&self) -> Option<&NdArray> {
        match self {
            Self::NdArray(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<NdArray> for ArgValue {
    fn from(arr: NdArray) -> Self {
        Self::NdArray(arr)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}
