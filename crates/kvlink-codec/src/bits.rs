//! Per-kind conversions between native values and wire bytes.
//!
//! All integers are little-endian signed 32-bit, all floats little-endian
//! IEEE-754 64-bit. Decoders take exactly the bytes a tag declares and
//! reject anything that does not fit that length.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::value::{Matrix, Tensor, Value, ValueKind};

/// Width of an Int32 on the wire.
pub const INT_LEN: usize = 4;
/// Width of a Float64 on the wire.
pub const FLOAT_LEN: usize = 8;
/// Width of a bool on the wire.
pub const BOOL_LEN: usize = 1;

/// Fixed-width numeric element of arrays, matrices and tensors.
pub trait Element: Copy + Sized {
    /// Encoded width in bytes.
    const WIDTH: usize;
    const ARRAY: ValueKind;
    const MATRIX: ValueKind;
    const TENSOR: ValueKind;

    fn put(self, dst: &mut BytesMut);

    /// Read one element. `src` holds at least `WIDTH` bytes.
    fn get(src: &mut &[u8]) -> Self;
}

impl Element for i32 {
    const WIDTH: usize = INT_LEN;
    const ARRAY: ValueKind = ValueKind::Int32Array;
    const MATRIX: ValueKind = ValueKind::Int32Matrix;
    const TENSOR: ValueKind = ValueKind::Int32Tensor;

    fn put(self, dst: &mut BytesMut) {
        dst.put_i32_le(self);
    }

    fn get(src: &mut &[u8]) -> Self {
        src.get_i32_le()
    }
}

impl Element for f64 {
    const WIDTH: usize = FLOAT_LEN;
    const ARRAY: ValueKind = ValueKind::Float64Array;
    const MATRIX: ValueKind = ValueKind::Float64Matrix;
    const TENSOR: ValueKind = ValueKind::Float64Tensor;

    fn put(self, dst: &mut BytesMut) {
        dst.put_u64_le(self.to_bits());
    }

    fn get(src: &mut &[u8]) -> Self {
        f64::from_bits(src.get_u64_le())
    }
}

fn malformed(kind: ValueKind, reason: impl Into<String>) -> CodecError {
    CodecError::Malformed {
        kind,
        reason: reason.into(),
    }
}

fn expect_len(kind: ValueKind, src: &[u8], len: usize) -> Result<()> {
    if src.len() != len {
        return Err(malformed(
            kind,
            format!("expected {len} bytes, got {}", src.len()),
        ));
    }
    Ok(())
}

fn dim_to_i32(dim: usize) -> Result<i32> {
    i32::try_from(dim).map_err(|_| CodecError::TooLarge {
        what: "dimension",
        size: dim,
    })
}

fn read_dims<const N: usize>(kind: ValueKind, src: &mut &[u8]) -> Result<[usize; N]> {
    if src.len() < N * INT_LEN {
        return Err(malformed(
            kind,
            format!("{} bytes cannot hold {N} dimension fields", src.len()),
        ));
    }
    let mut dims = [0usize; N];
    for dim in dims.iter_mut() {
        let raw = src.get_i32_le();
        *dim = usize::try_from(raw)
            .map_err(|_| malformed(kind, format!("negative dimension {raw}")))?;
    }
    Ok(dims)
}

fn element_bytes<T: Element>(kind: ValueKind, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(T::WIDTH, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| malformed(kind, format!("dimensions {dims:?} overflow")))
}

pub fn encode_bool(value: bool, dst: &mut BytesMut) {
    dst.put_u8(u8::from(value));
}

/// Zero is `false`, any other byte `true`.
pub fn decode_bool(src: &[u8]) -> Result<bool> {
    expect_len(ValueKind::Bool, src, BOOL_LEN)?;
    Ok(src[0] != 0)
}

pub fn encode_i32(value: i32, dst: &mut BytesMut) {
    value.put(dst);
}

pub fn decode_i32(mut src: &[u8]) -> Result<i32> {
    expect_len(ValueKind::Int32, src, INT_LEN)?;
    Ok(i32::get(&mut src))
}

pub fn encode_f64(value: f64, dst: &mut BytesMut) {
    value.put(dst);
}

pub fn decode_f64(mut src: &[u8]) -> Result<f64> {
    expect_len(ValueKind::Float64, src, FLOAT_LEN)?;
    Ok(f64::get(&mut src))
}

pub fn encode_str(value: &str, dst: &mut BytesMut) {
    dst.put_slice(value.as_bytes());
}

pub fn decode_str(src: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(src)?.to_owned())
}

/// Concatenate fixed-width elements.
pub fn encode_slice<T: Element>(values: &[T], dst: &mut BytesMut) {
    dst.reserve(values.len() * T::WIDTH);
    for &value in values {
        value.put(dst);
    }
}

/// Strided decode of fixed-width elements.
pub fn decode_slice<T: Element>(mut src: &[u8]) -> Result<Vec<T>> {
    if src.len() % T::WIDTH != 0 {
        return Err(malformed(
            T::ARRAY,
            format!(
                "{} bytes is not a multiple of the {}-byte element width",
                src.len(),
                T::WIDTH
            ),
        ));
    }
    let mut out = Vec::with_capacity(src.len() / T::WIDTH);
    while src.has_remaining() {
        out.push(T::get(&mut src));
    }
    Ok(out)
}

/// Two Int32 dimension fields, then the row-major elements.
pub fn encode_matrix<T: Element>(value: &Matrix<T>, dst: &mut BytesMut) -> Result<()> {
    let rows = dim_to_i32(value.rows())?;
    let cols = dim_to_i32(value.cols())?;
    dst.reserve(2 * INT_LEN + value.data().len() * T::WIDTH);
    dst.put_i32_le(rows);
    dst.put_i32_le(cols);
    encode_slice(value.data(), dst);
    Ok(())
}

pub fn decode_matrix<T: Element>(mut src: &[u8]) -> Result<Matrix<T>> {
    let [rows, cols] = read_dims::<2>(T::MATRIX, &mut src)?;
    let needed = element_bytes::<T>(T::MATRIX, &[rows, cols])?;
    if src.len() != needed {
        return Err(malformed(
            T::MATRIX,
            format!(
                "{rows}x{cols} elements need {needed} bytes, got {}",
                src.len()
            ),
        ));
    }
    Matrix::new(rows, cols, decode_slice(src)?)
}

/// Three Int32 dimension fields, then the row-major elements.
pub fn encode_tensor<T: Element>(value: &Tensor<T>, dst: &mut BytesMut) -> Result<()> {
    let dims = value.dims();
    let encoded = [
        dim_to_i32(dims[0])?,
        dim_to_i32(dims[1])?,
        dim_to_i32(dims[2])?,
    ];
    dst.reserve(3 * INT_LEN + value.data().len() * T::WIDTH);
    for dim in encoded {
        dst.put_i32_le(dim);
    }
    encode_slice(value.data(), dst);
    Ok(())
}

pub fn decode_tensor<T: Element>(mut src: &[u8]) -> Result<Tensor<T>> {
    let dims = read_dims::<3>(T::TENSOR, &mut src)?;
    let needed = element_bytes::<T>(T::TENSOR, &dims)?;
    if src.len() != needed {
        return Err(malformed(
            T::TENSOR,
            format!(
                "{}x{}x{} elements need {needed} bytes, got {}",
                dims[0],
                dims[1],
                dims[2],
                src.len()
            ),
        ));
    }
    Tensor::new(dims, decode_slice(src)?)
}

/// Number of payload bytes `value` encodes to, without encoding it.
pub fn encoded_len(value: &Value) -> Result<usize> {
    let len = match value {
        Value::Null => Some(0),
        Value::Bool(_) => Some(BOOL_LEN),
        Value::Int32(_) => Some(INT_LEN),
        Value::Float64(_) => Some(FLOAT_LEN),
        Value::String(v) => Some(v.len()),
        Value::Bytes(v) => Some(v.len()),
        Value::Int32Array(v) => v.len().checked_mul(INT_LEN),
        Value::Float64Array(v) => v.len().checked_mul(FLOAT_LEN),
        Value::Int32Matrix(v) => container_len(2, v.data().len(), INT_LEN),
        Value::Float64Matrix(v) => container_len(2, v.data().len(), FLOAT_LEN),
        Value::Int32Tensor(v) => container_len(3, v.data().len(), INT_LEN),
        Value::Float64Tensor(v) => container_len(3, v.data().len(), FLOAT_LEN),
    };
    match len {
        Some(len) if len <= i32::MAX as usize => Ok(len),
        Some(len) => Err(CodecError::TooLarge {
            what: "field length",
            size: len,
        }),
        None => Err(CodecError::TooLarge {
            what: "field length",
            size: usize::MAX,
        }),
    }
}

fn container_len(rank: usize, elements: usize, width: usize) -> Option<usize> {
    elements.checked_mul(width)?.checked_add(rank * INT_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_little_endian_signed() {
        let mut buf = BytesMut::new();
        encode_i32(-2, &mut buf);
        assert_eq!(buf.as_ref(), &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_i32(&buf).unwrap(), -2);
    }

    #[test]
    fn int_extremes_roundtrip() {
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            let mut buf = BytesMut::new();
            encode_i32(v, &mut buf);
            assert_eq!(decode_i32(&buf).unwrap(), v);
        }
    }

    #[test]
    fn float_is_little_endian_ieee754() {
        let mut buf = BytesMut::new();
        encode_f64(1.0, &mut buf);
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0, 0, 0, 0xF0, 0x3F]);
    }

    #[test]
    fn float_special_values_are_bit_exact() {
        let nan = f64::from_bits(0x7FF8_0000_0000_1234);
        for v in [nan, f64::INFINITY, f64::NEG_INFINITY, -0.0, f64::MIN_POSITIVE] {
            let mut buf = BytesMut::new();
            encode_f64(v, &mut buf);
            assert_eq!(decode_f64(&buf).unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn bool_treats_any_nonzero_as_true() {
        assert!(!decode_bool(&[0]).unwrap());
        assert!(decode_bool(&[1]).unwrap());
        assert!(decode_bool(&[0x80]).unwrap());
        let mut buf = BytesMut::new();
        encode_bool(true, &mut buf);
        assert_eq!(buf.as_ref(), &[1]);
    }

    #[test]
    fn scalar_decoders_reject_wrong_lengths() {
        assert!(matches!(decode_i32(&[1, 2]), Err(CodecError::Malformed { .. })));
        assert!(matches!(decode_f64(&[0; 9]), Err(CodecError::Malformed { .. })));
        assert!(matches!(decode_bool(&[]), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        assert!(matches!(
            decode_str(&[0xFF, 0xFE]),
            Err(CodecError::InvalidUtf8(_))
        ));
        assert_eq!(decode_str("žluťoučký".as_bytes()).unwrap(), "žluťoučký");
    }

    #[test]
    fn slice_decode_is_strided() {
        let mut buf = BytesMut::new();
        encode_slice(&[1i32, -1, 300], &mut buf);
        assert_eq!(buf.len(), 12);
        assert_eq!(decode_slice::<i32>(&buf).unwrap(), vec![1, -1, 300]);
        assert!(decode_slice::<f64>(&[]).unwrap().is_empty());
    }

    #[test]
    fn slice_rejects_partial_element() {
        let err = decode_slice::<f64>(&[0; 12]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                kind: ValueKind::Float64Array,
                ..
            }
        ));
    }

    #[test]
    fn matrix_layout_is_dims_then_row_major() {
        let m = Matrix::new(2, 2, vec![1i32, 2, 3, 4]).unwrap();
        let mut buf = BytesMut::new();
        encode_matrix(&m, &mut buf).unwrap();
        let expected: Vec<u8> = [2i32, 2, 1, 2, 3, 4]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(buf.as_ref(), expected.as_slice());
        assert_eq!(decode_matrix::<i32>(&buf).unwrap(), m);
    }

    #[test]
    fn matrix_rejects_negative_dimension() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(-1);
        buf.put_i32_le(2);
        let err = decode_matrix::<f64>(&buf).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn matrix_rejects_length_disagreeing_with_dims() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(2);
        buf.put_i32_le(2);
        buf.put_f64_le(1.0);
        let err = decode_matrix::<f64>(&buf).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn matrix_requires_dimension_fields() {
        let err = decode_matrix::<i32>(&[0; 4]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn tensor_roundtrip_with_zero_dimension() {
        let t: Tensor<f64> = Tensor::new([4, 0, 7], Vec::new()).unwrap();
        let mut buf = BytesMut::new();
        encode_tensor(&t, &mut buf).unwrap();
        assert_eq!(buf.len(), 3 * INT_LEN);
        assert_eq!(decode_tensor::<f64>(&buf).unwrap(), t);
    }

    #[test]
    fn encoded_len_counts_dimension_fields() {
        let m = Matrix::new(1, 3, vec![0.5f64; 3]).unwrap();
        assert_eq!(encoded_len(&Value::Float64Matrix(m)).unwrap(), 8 + 24);
        let t = Tensor::new([1, 1, 2], vec![7i32, 8]).unwrap();
        assert_eq!(encoded_len(&Value::Int32Tensor(t)).unwrap(), 12 + 8);
        assert_eq!(encoded_len(&Value::from("héllo")).unwrap(), 6);
    }
}
