use std::fmt;

use serde::Serialize;

use crate::error::{CodecError, Result};

/// A single field value.
///
/// Equality compares floats by their bit pattern, so a decoded NaN equals
/// the NaN that was encoded and `0.0 != -0.0`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Int32Array(Vec<i32>),
    Float64Array(Vec<f64>),
    Int32Matrix(Matrix<i32>),
    Float64Matrix(Matrix<f64>),
    Int32Tensor(Tensor<i32>),
    Float64Tensor(Tensor<f64>),
}

/// Field-less discriminant of [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Int32,
    Float64,
    String,
    Bytes,
    Int32Array,
    Float64Array,
    Int32Matrix,
    Float64Matrix,
    Int32Tensor,
    Float64Tensor,
}

impl ValueKind {
    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int32 => "int32",
            ValueKind::Float64 => "float64",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Int32Array => "int32 array",
            ValueKind::Float64Array => "float64 array",
            ValueKind::Int32Matrix => "int32 matrix",
            ValueKind::Float64Matrix => "float64 matrix",
            ValueKind::Int32Tensor => "int32 tensor",
            ValueKind::Float64Tensor => "float64 tensor",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Float64(_) => ValueKind::Float64,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Int32Array(_) => ValueKind::Int32Array,
            Value::Float64Array(_) => ValueKind::Float64Array,
            Value::Int32Matrix(_) => ValueKind::Int32Matrix,
            Value::Float64Matrix(_) => ValueKind::Float64Matrix,
            Value::Int32Tensor(_) => ValueKind::Int32Tensor,
            Value::Float64Tensor(_) => ValueKind::Float64Tensor,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Int32Array(a), Value::Int32Array(b)) => a == b,
            (Value::Float64Array(a), Value::Float64Array(b)) => floats_eq(a, b),
            (Value::Int32Matrix(a), Value::Int32Matrix(b)) => a == b,
            (Value::Float64Matrix(a), Value::Float64Matrix(b)) => {
                a.shape() == b.shape() && floats_eq(a.data(), b.data())
            }
            (Value::Int32Tensor(a), Value::Int32Tensor(b)) => a == b,
            (Value::Float64Tensor(a), Value::Float64Tensor(b)) => {
                a.dims() == b.dims() && floats_eq(a.data(), b.data())
            }
            _ => false,
        }
    }
}

fn floats_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::Int32Array(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Float64Array(v)
    }
}

impl From<Matrix<i32>> for Value {
    fn from(v: Matrix<i32>) -> Self {
        Value::Int32Matrix(v)
    }
}

impl From<Matrix<f64>> for Value {
    fn from(v: Matrix<f64>) -> Self {
        Value::Float64Matrix(v)
    }
}

impl From<Tensor<i32>> for Value {
    fn from(v: Tensor<i32>) -> Self {
        Value::Int32Tensor(v)
    }
}

impl From<Tensor<f64>> for Value {
    fn from(v: Tensor<f64>) -> Self {
        Value::Float64Tensor(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Row-major 2-D container.
///
/// `data.len() == rows * cols` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Build a matrix from flattened row-major elements.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        check_shape(&[rows, cols], data.len())?;
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from nested rows. Ragged rows are rejected; no rows
    /// gives a 0x0 matrix.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(row_count.saturating_mul(cols));
        for row in rows {
            if row.len() != cols {
                return Err(CodecError::ShapeMismatch {
                    dims: vec![row_count, cols],
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Self::new(row_count, cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Flattened row-major elements.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }
}

/// Row-major 3-D container.
///
/// `data.len() == dims[0] * dims[1] * dims[2]` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tensor<T> {
    dims: [usize; 3],
    data: Vec<T>,
}

impl<T> Tensor<T> {
    /// Build a tensor from flattened row-major elements.
    pub fn new(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
        check_shape(&dims, data.len())?;
        Ok(Self { dims, data })
    }

    /// Build a tensor from nested planes of rows. Ragged nesting is rejected.
    pub fn from_nested(planes: Vec<Vec<Vec<T>>>) -> Result<Self> {
        let a = planes.len();
        let b = planes.first().map_or(0, Vec::len);
        let c = planes
            .first()
            .and_then(|plane| plane.first())
            .map_or(0, Vec::len);
        let mut data = Vec::with_capacity(a.saturating_mul(b).saturating_mul(c));
        for plane in planes {
            if plane.len() != b {
                return Err(CodecError::ShapeMismatch {
                    dims: vec![a, b, c],
                    expected: b,
                    actual: plane.len(),
                });
            }
            for row in plane {
                if row.len() != c {
                    return Err(CodecError::ShapeMismatch {
                        dims: vec![a, b, c],
                        expected: c,
                        actual: row.len(),
                    });
                }
                data.extend(row);
            }
        }
        Self::new([a, b, c], data)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Flattened row-major elements.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        let [a, b, c] = self.dims;
        if i >= a || j >= b || k >= c {
            return None;
        }
        self.data.get((i * b + j) * c + k)
    }
}

fn check_shape(dims: &[usize], actual: usize) -> Result<()> {
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(CodecError::TooLarge {
            what: "element count",
            size: usize::MAX,
        })?;
    if expected != actual {
        return Err(CodecError::ShapeMismatch {
            dims: dims.to_vec(),
            expected,
            actual,
        });
    }
    Ok(())
}
