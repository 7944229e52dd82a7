use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};

use crate::bits::{self, BOOL_LEN, FLOAT_LEN, INT_LEN};
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueKind};

/// Registry entry bundling a value kind's predicates and codec functions.
///
/// A descriptor matches the tags `<prefix>` (fixed-size kinds) or
/// `<prefix><N>` (sized kinds, `N` = payload bytes in decimal).
#[derive(Clone, Copy)]
pub struct Descriptor {
    /// Kind of value this descriptor encodes.
    pub kind: ValueKind,
    /// Leading characters of the type tag.
    pub prefix: &'static str,
    /// Payload length of a fixed-size kind, `None` when the tag carries it.
    pub fixed_len: Option<usize>,
    encode: fn(&Value, &mut BytesMut) -> Result<()>,
    decode: fn(&[u8]) -> Result<Value>,
}

impl Descriptor {
    /// Whether this descriptor can encode `value`.
    pub fn accepts_value(&self, value: &Value) -> bool {
        value.kind() == self.kind
    }

    /// Whether this descriptor can decode fields tagged `tag`.
    pub fn accepts_tag(&self, tag: &str) -> bool {
        match (tag.strip_prefix(self.prefix), self.fixed_len) {
            (Some(rest), None) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
            (Some(rest), Some(_)) => rest.is_empty(),
            (None, _) => false,
        }
    }

    /// The tag `value` is sent under.
    pub fn tag_for(&self, value: &Value) -> Result<String> {
        if !self.accepts_value(value) {
            return Err(CodecError::UnsupportedValue(value.kind()));
        }
        Ok(match self.fixed_len {
            Some(_) => self.prefix.to_string(),
            None => format!("{}{}", self.prefix, bits::encoded_len(value)?),
        })
    }

    /// Append the payload bytes of `value` to `dst`.
    pub fn encode(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        (self.encode)(value, dst)
    }

    /// Payload length declared by `tag`.
    pub fn byte_len(&self, tag: &str) -> Result<usize> {
        if !self.accepts_tag(tag) {
            return Err(CodecError::UnknownTag(tag.to_string()));
        }
        match self.fixed_len {
            Some(len) => Ok(len),
            None => tag[self.prefix.len()..]
                .parse()
                .map_err(|_| CodecError::UnknownTag(tag.to_string())),
        }
    }

    /// Decode exactly the bytes of one field.
    pub fn decode(&self, src: &[u8]) -> Result<Value> {
        (self.decode)(src)
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .field("fixed_len", &self.fixed_len)
            .finish()
    }
}

/// The standard descriptor table, in precedence order.
///
/// Tag matching is first-match-wins; the order is kept so that prefixes
/// sharing a first letter (`b` / `b<N>`, `d` / `d<N>`, `i` / `i<N>`)
/// resolve the same way on every peer.
pub static DESCRIPTORS: [Descriptor; 12] = [
    Descriptor {
        kind: ValueKind::Null,
        prefix: "n",
        fixed_len: Some(0),
        encode: encode_null,
        decode: decode_null,
    },
    Descriptor {
        kind: ValueKind::String,
        prefix: "s",
        fixed_len: None,
        encode: encode_string,
        decode: decode_string,
    },
    Descriptor {
        kind: ValueKind::Bool,
        prefix: "b",
        fixed_len: Some(BOOL_LEN),
        encode: encode_bool,
        decode: decode_bool,
    },
    Descriptor {
        kind: ValueKind::Int32,
        prefix: "i",
        fixed_len: Some(INT_LEN),
        encode: encode_int32,
        decode: decode_int32,
    },
    Descriptor {
        kind: ValueKind::Float64,
        prefix: "d",
        fixed_len: Some(FLOAT_LEN),
        encode: encode_float64,
        decode: decode_float64,
    },
    Descriptor {
        kind: ValueKind::Bytes,
        prefix: "b",
        fixed_len: None,
        encode: encode_bytes,
        decode: decode_bytes,
    },
    Descriptor {
        kind: ValueKind::Float64Array,
        prefix: "d",
        fixed_len: None,
        encode: encode_float64_array,
        decode: decode_float64_array,
    },
    Descriptor {
        kind: ValueKind::Float64Matrix,
        prefix: "md",
        fixed_len: None,
        encode: encode_float64_matrix,
        decode: decode_float64_matrix,
    },
    Descriptor {
        kind: ValueKind::Float64Tensor,
        prefix: "mmd",
        fixed_len: None,
        encode: encode_float64_tensor,
        decode: decode_float64_tensor,
    },
    Descriptor {
        kind: ValueKind::Int32Array,
        prefix: "i",
        fixed_len: None,
        encode: encode_int32_array,
        decode: decode_int32_array,
    },
    Descriptor {
        kind: ValueKind::Int32Matrix,
        prefix: "mi",
        fixed_len: None,
        encode: encode_int32_matrix,
        decode: decode_int32_matrix,
    },
    Descriptor {
        kind: ValueKind::Int32Tensor,
        prefix: "mmi",
        fixed_len: None,
        encode: encode_int32_tensor,
        decode: decode_int32_tensor,
    },
];

/// Ordered descriptor list resolving value → tag and tag → decoder.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    descriptors: Vec<Descriptor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_descriptors(DESCRIPTORS.to_vec())
    }
}

impl TypeRegistry {
    /// Registry over an explicit descriptor list. Order is precedence.
    pub fn with_descriptors(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    /// Process-wide registry over [`DESCRIPTORS`].
    pub fn standard() -> &'static TypeRegistry {
        static STANDARD: OnceLock<TypeRegistry> = OnceLock::new();
        STANDARD.get_or_init(TypeRegistry::default)
    }

    /// First descriptor accepting `value`.
    pub fn for_value(&self, value: &Value) -> Result<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.accepts_value(value))
            .ok_or(CodecError::UnsupportedValue(value.kind()))
    }

    /// First descriptor accepting `tag`.
    pub fn for_tag(&self, tag: &str) -> Result<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.accepts_tag(tag))
            .ok_or_else(|| CodecError::UnknownTag(tag.to_string()))
    }

    /// Encode `value`, returning its tag and payload bytes.
    pub fn encode(&self, value: &Value) -> Result<(String, Bytes)> {
        let mut buf = BytesMut::new();
        let tag = self.encode_into(value, &mut buf)?;
        Ok((tag, buf.freeze()))
    }

    /// Append the payload bytes of `value` to `dst` and return its tag.
    pub fn encode_into(&self, value: &Value, dst: &mut BytesMut) -> Result<String> {
        let descriptor = self.for_value(value)?;
        let tag = descriptor.tag_for(value)?;
        let start = dst.len();
        descriptor.encode(value, dst)?;
        debug_assert_eq!(
            descriptor.byte_len(&tag).ok(),
            Some(dst.len() - start),
            "tag {tag} disagrees with encoded length"
        );
        Ok(tag)
    }

    /// Decode one field from the front of `src`.
    ///
    /// Returns the value and the number of bytes consumed, which is always
    /// the length `tag` declares; bytes past it are never read.
    pub fn decode(&self, tag: &str, src: &[u8]) -> Result<(Value, usize)> {
        let descriptor = self.for_tag(tag)?;
        let len = descriptor.byte_len(tag)?;
        let field = src.get(..len).ok_or_else(|| CodecError::Truncated {
            tag: tag.to_string(),
            needed: len,
            available: src.len(),
        })?;
        Ok((descriptor.decode(field)?, len))
    }

    /// Payload length declared by `tag`.
    pub fn byte_len(&self, tag: &str) -> Result<usize> {
        self.for_tag(tag)?.byte_len(tag)
    }
}

fn mismatch(value: &Value) -> CodecError {
    CodecError::UnsupportedValue(value.kind())
}

fn encode_null(value: &Value, _dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        other => Err(mismatch(other)),
    }
}

fn decode_null(_src: &[u8]) -> Result<Value> {
    Ok(Value::Null)
}

fn encode_string(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::String(v) => {
            bits::encode_str(v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_string(src: &[u8]) -> Result<Value> {
    bits::decode_str(src).map(Value::String)
}

fn encode_bool(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Bool(v) => {
            bits::encode_bool(*v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_bool(src: &[u8]) -> Result<Value> {
    bits::decode_bool(src).map(Value::Bool)
}

fn encode_int32(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Int32(v) => {
            bits::encode_i32(*v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_int32(src: &[u8]) -> Result<Value> {
    bits::decode_i32(src).map(Value::Int32)
}

fn encode_float64(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Float64(v) => {
            bits::encode_f64(*v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_float64(src: &[u8]) -> Result<Value> {
    bits::decode_f64(src).map(Value::Float64)
}

fn encode_bytes(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Bytes(v) => {
            dst.extend_from_slice(v);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_bytes(src: &[u8]) -> Result<Value> {
    Ok(Value::Bytes(src.to_vec()))
}

fn encode_float64_array(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Float64Array(v) => {
            bits::encode_slice(v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_float64_array(src: &[u8]) -> Result<Value> {
    bits::decode_slice(src).map(Value::Float64Array)
}

fn encode_int32_array(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Int32Array(v) => {
            bits::encode_slice(v, dst);
            Ok(())
        }
        other => Err(mismatch(other)),
    }
}

fn decode_int32_array(src: &[u8]) -> Result<Value> {
    bits::decode_slice(src).map(Value::Int32Array)
}

fn encode_float64_matrix(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Float64Matrix(v) => bits::encode_matrix(v, dst),
        other => Err(mismatch(other)),
    }
}

fn decode_float64_matrix(src: &[u8]) -> Result<Value> {
    bits::decode_matrix(src).map(Value::Float64Matrix)
}

fn encode_int32_matrix(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Int32Matrix(v) => bits::encode_matrix(v, dst),
        other => Err(mismatch(other)),
    }
}

fn decode_int32_matrix(src: &[u8]) -> Result<Value> {
    bits::decode_matrix(src).map(Value::Int32Matrix)
}

fn encode_float64_tensor(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Float64Tensor(v) => bits::encode_tensor(v, dst),
        other => Err(mismatch(other)),
    }
}

fn decode_float64_tensor(src: &[u8]) -> Result<Value> {
    bits::decode_tensor(src).map(Value::Float64Tensor)
}

fn encode_int32_tensor(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Int32Tensor(v) => bits::encode_tensor(v, dst),
        other => Err(mismatch(other)),
    }
}

fn decode_int32_tensor(src: &[u8]) -> Result<Value> {
    bits::decode_tensor(src).map(Value::Int32Tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Matrix, Tensor};

    fn registry() -> &'static TypeRegistry {
        TypeRegistry::standard()
    }

    #[test]
    fn scalar_tags() {
        let r = registry();
        assert_eq!(r.encode(&Value::Null).unwrap().0, "n");
        assert_eq!(r.encode(&Value::Bool(true)).unwrap().0, "b");
        assert_eq!(r.encode(&Value::Int32(5)).unwrap().0, "i");
        assert_eq!(r.encode(&Value::Float64(2.5)).unwrap().0, "d");
    }

    #[test]
    fn sized_tags_carry_payload_length() {
        let r = registry();
        assert_eq!(r.encode(&Value::from("abc")).unwrap().0, "s3");
        assert_eq!(r.encode(&Value::from("é")).unwrap().0, "s2");
        assert_eq!(r.encode(&Value::Bytes(vec![0; 7])).unwrap().0, "b7");
        assert_eq!(r.encode(&Value::Int32Array(vec![1, 2])).unwrap().0, "i8");
        assert_eq!(r.encode(&Value::Float64Array(vec![1.0])).unwrap().0, "d8");
        let m = Matrix::new(2, 3, vec![0i32; 6]).unwrap();
        assert_eq!(r.encode(&Value::Int32Matrix(m)).unwrap().0, "mi32");
        let t = Tensor::new([1, 2, 2], vec![0.0f64; 4]).unwrap();
        assert_eq!(r.encode(&Value::Float64Tensor(t)).unwrap().0, "mmd44");
    }

    #[test]
    fn empty_sized_values_use_zero_length_tags() {
        let r = registry();
        assert_eq!(r.encode(&Value::from("")).unwrap().0, "s0");
        assert_eq!(r.encode(&Value::Bytes(Vec::new())).unwrap().0, "b0");
        assert_eq!(r.encode(&Value::Int32Array(Vec::new())).unwrap().0, "i0");
        assert_eq!(r.encode(&Value::Float64Array(Vec::new())).unwrap().0, "d0");
    }

    #[test]
    fn first_match_separates_scalar_and_sized_prefixes() {
        let r = registry();
        assert_eq!(r.for_tag("b").unwrap().kind, ValueKind::Bool);
        assert_eq!(r.for_tag("b1").unwrap().kind, ValueKind::Bytes);
        assert_eq!(r.for_tag("i").unwrap().kind, ValueKind::Int32);
        assert_eq!(r.for_tag("i4").unwrap().kind, ValueKind::Int32Array);
        assert_eq!(r.for_tag("d").unwrap().kind, ValueKind::Float64);
        assert_eq!(r.for_tag("d16").unwrap().kind, ValueKind::Float64Array);
        assert_eq!(r.for_tag("md8").unwrap().kind, ValueKind::Float64Matrix);
        assert_eq!(r.for_tag("mmd12").unwrap().kind, ValueKind::Float64Tensor);
        assert_eq!(r.for_tag("mi8").unwrap().kind, ValueKind::Int32Matrix);
        assert_eq!(r.for_tag("mmi12").unwrap().kind, ValueKind::Int32Tensor);
    }

    #[test]
    fn unknown_tags_are_lookup_errors() {
        let r = registry();
        for tag in ["", "x", "s", "s3x", "n0", "i-4", "m8", "mmmi12", "S3"] {
            assert!(
                matches!(r.decode(tag, &[0; 32]), Err(CodecError::UnknownTag(_))),
                "tag {tag:?} should not resolve"
            );
        }
    }

    #[test]
    fn custom_registry_without_descriptor_fails_lookup() {
        let scalars_only = TypeRegistry::with_descriptors(DESCRIPTORS[..5].to_vec());
        let err = scalars_only.encode(&Value::Bytes(vec![1])).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedValue(ValueKind::Bytes)));
        assert!(scalars_only.encode(&Value::Int32(1)).is_ok());
    }

    #[test]
    fn decode_consumes_only_declared_length() {
        let r = registry();
        let buf = [7u8, 0, 0, 0, 0xAA, 0xBB];
        let (value, used) = r.decode("i", &buf).unwrap();
        assert_eq!(value, Value::Int32(7));
        assert_eq!(used, 4);

        let (value, used) = r.decode("s2", b"hiTRAILING").unwrap();
        assert_eq!(value, Value::from("hi"));
        assert_eq!(used, 2);
    }

    #[test]
    fn decode_reports_truncation() {
        let err = registry().decode("s10", b"short").unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                needed: 10,
                available: 5,
                ..
            }
        ));
    }

    #[test]
    fn null_consumes_nothing() {
        let (value, used) = registry().decode("n", &[]).unwrap();
        assert!(value.is_null());
        assert_eq!(used, 0);
    }

    #[test]
    fn byte_len_matches_encoded_bytes() {
        let r = registry();
        let values = [
            Value::Null,
            Value::Bool(false),
            Value::Int32(-1),
            Value::Float64(f64::NAN),
            Value::from("kvlink"),
            Value::Bytes(vec![1, 2, 3]),
            Value::Int32Array(vec![1, 2, 3]),
            Value::Float64Array(vec![0.25; 4]),
            Value::Int32Matrix(Matrix::new(2, 1, vec![1, 2]).unwrap()),
            Value::Float64Matrix(Matrix::new(1, 2, vec![1.0, 2.0]).unwrap()),
            Value::Int32Tensor(Tensor::new([1, 1, 1], vec![9]).unwrap()),
            Value::Float64Tensor(Tensor::new([2, 1, 1], vec![1.5, 2.5]).unwrap()),
        ];
        for value in values {
            let (tag, bytes) = r.encode(&value).unwrap();
            assert_eq!(r.byte_len(&tag).unwrap(), bytes.len(), "tag {tag}");
            let (decoded, used) = r.decode(&tag, &bytes).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(used, bytes.len());
        }
    }

    #[test]
    fn descriptor_rejects_foreign_value() {
        let int_descriptor = &DESCRIPTORS[3];
        let mut buf = BytesMut::new();
        let err = int_descriptor
            .encode(&Value::Float64(1.0), &mut buf)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedValue(ValueKind::Float64)));
        assert!(int_descriptor.tag_for(&Value::Null).is_err());
    }
}
