//! Dense numeric arrays exchanged between client and server.
//!
//! Arrays travel as nested JSON lists (a bare number is a 0-d array) and are
//! held as a shape plus row-major `f64` data. JSON has no non-finite numbers,
//! so those travel as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Array construction and comparison errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayError {
    #[error("not valid JSON: {0}")]
    Json(String),

    #[error("non-numeric element: {0}")]
    NonNumeric(String),

    #[error("ragged nested list: expected shape {expected:?}, found {found:?}")]
    Ragged {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("shape {shape:?} does not hold {len} elements")]
    ShapeLen { shape: Vec<usize>, len: usize },

    #[error("shapes {left:?} and {right:?} cannot be broadcast together")]
    Broadcast { left: Vec<usize>, right: Vec<usize> },
}

/// N-dimensional `f64` array.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    /// 0-d array holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// 1-d array.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ArrayError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ArrayError::ShapeLen {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// 2-d array from rows of equal length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ArrayError> {
        let cols = rows.first().map_or(0, Vec::len);
        let shape = vec![rows.len(), cols];
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(ArrayError::Ragged {
                    expected: vec![cols],
                    found: vec![row.len()],
                });
            }
            data.extend(row);
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a full multi-index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.data.get(offset).copied()
    }

    /// Parse a JSON document (number or nested list) into an array.
    pub fn parse(text: &str) -> Result<Self, ArrayError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ArrayError::Json(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, ArrayError> {
        let mut data = Vec::new();
        let shape = collect(value, &mut data)?;
        Ok(Self { shape, data })
    }

    /// Nested-list JSON form.
    pub fn to_json(&self) -> Value {
        if self.shape.is_empty() {
            return self.data.first().copied().map_or(Value::Null, number);
        }
        nest(&self.shape, &self.data)
    }
}

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

fn number(v: f64) -> Value {
    if v.is_nan() {
        Value::from(NAN)
    } else if v == f64::INFINITY {
        Value::from(INFINITY)
    } else if v == f64::NEG_INFINITY {
        Value::from(NEG_INFINITY)
    } else {
        Value::from(v)
    }
}

fn non_finite(text: &str) -> Option<f64> {
    match text {
        NAN => Some(f64::NAN),
        INFINITY => Some(f64::INFINITY),
        NEG_INFINITY => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn collect(value: &Value, out: &mut Vec<f64>) -> Result<Vec<usize>, ArrayError> {
    match value {
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| ArrayError::NonNumeric(n.to_string()))?;
            out.push(v);
            Ok(Vec::new())
        }
        Value::String(text) => {
            let v = non_finite(text).ok_or_else(|| ArrayError::NonNumeric(value.to_string()))?;
            out.push(v);
            Ok(Vec::new())
        }
        Value::Array(items) => {
            let mut inner: Option<Vec<usize>> = None;
            for item in items {
                let shape = collect(item, out)?;
                match &inner {
                    None => inner = Some(shape),
                    Some(expected) if *expected != shape => {
                        return Err(ArrayError::Ragged {
                            expected: expected.clone(),
                            found: shape,
                        });
                    }
                    Some(_) => {}
                }
            }
            let mut shape = vec![items.len()];
            shape.extend(inner.unwrap_or_default());
            Ok(shape)
        }
        other => Err(ArrayError::NonNumeric(other.to_string())),
    }
}

fn nest(shape: &[usize], data: &[f64]) -> Value {
    match shape {
        [] => data.first().copied().map_or(Value::Null, number),
        [_] => Value::Array(data.iter().copied().map(number).collect()),
        [dim, rest @ ..] => {
            let stride: usize = rest.iter().product();
            let items = (0..*dim)
                .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                .collect();
            Value::Array(items)
        }
    }
}

impl Serialize for NdArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NdArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}
