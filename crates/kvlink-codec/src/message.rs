use bytes::BytesMut;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::registry::TypeRegistry;
use crate::value::Value;

/// Separator between header entries.
pub const ENTRY_SEPARATOR: char = ';';
/// Separator between a field name and its tag.
pub const TAG_SEPARATOR: char = ':';

/// Ordered mapping of field names to values.
///
/// Insertion order is wire order. Inserting an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: Vec<(String, Value)>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, returning the previous value of that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Message {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut message = Message::new();
        for (name, value) in iter {
            message.insert(name, value);
        }
        message
    }
}

impl IntoIterator for Message {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Types that can be sent as a message.
pub trait IntoMessage {
    fn into_message(self) -> Message;
}

impl IntoMessage for Message {
    fn into_message(self) -> Message {
        self
    }
}

fn check_field_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(TAG_SEPARATOR) || name.contains(ENTRY_SEPARATOR) {
        return Err(CodecError::InvalidFieldName(name.to_string()));
    }
    Ok(())
}

/// Encode a message into its text header and binary payload.
pub fn encode_message(message: &Message) -> Result<(String, BytesMut)> {
    encode_message_with(TypeRegistry::standard(), message)
}

/// [`encode_message`] over an explicit registry.
pub fn encode_message_with(
    registry: &TypeRegistry,
    message: &Message,
) -> Result<(String, BytesMut)> {
    let mut header = String::new();
    let mut payload = BytesMut::new();

    for (index, (name, value)) in message.fields.iter().enumerate() {
        check_field_name(name)?;
        let tag = registry.encode_into(value, &mut payload)?;
        if index > 0 {
            header.push(ENTRY_SEPARATOR);
        }
        header.push_str(name);
        header.push(TAG_SEPARATOR);
        header.push_str(&tag);
    }

    trace!(
        fields = message.len(),
        header_len = header.len(),
        payload_len = payload.len(),
        "encoded message"
    );
    Ok((header, payload))
}

/// Decode a message from its text header and binary payload.
///
/// Every payload byte must belong to a header field.
pub fn decode_message(header: &str, payload: &[u8]) -> Result<Message> {
    decode_message_with(TypeRegistry::standard(), header, payload)
}

/// [`decode_message`] over an explicit registry.
pub fn decode_message_with(
    registry: &TypeRegistry,
    header: &str,
    payload: &[u8],
) -> Result<Message> {
    let mut message = Message::new();
    let mut cursor = 0usize;

    if !header.is_empty() {
        for entry in header.split(ENTRY_SEPARATOR) {
            let (name, tag) = entry
                .split_once(TAG_SEPARATOR)
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| CodecError::MalformedHeader(entry.to_string()))?;
            let (value, used) = registry.decode(tag, &payload[cursor..])?;
            cursor += used;
            message.insert(name, value);
        }
    }

    if cursor != payload.len() {
        return Err(CodecError::TrailingPayload {
            remaining: payload.len() - cursor,
        });
    }

    trace!(fields = message.len(), payload_len = payload.len(), "decoded message");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Matrix, Tensor, ValueKind};

    fn every_kind() -> Message {
        Message::new()
            .with("null", Value::Null)
            .with("flag", true)
            .with("count", 5)
            .with("ratio", 2.5)
            .with("name", "abc")
            .with("blob", vec![0u8, 255, 7])
            .with("ints", vec![i32::MIN, 0, i32::MAX])
            .with("floats", vec![f64::NAN, f64::INFINITY, -0.0])
            .with("imat", Matrix::new(2, 2, vec![1, 2, 3, 4]).unwrap())
            .with("dmat", Matrix::new(1, 3, vec![0.5, 1.5, 2.5]).unwrap())
            .with("iten", Tensor::new([2, 1, 2], vec![1, 2, 3, 4]).unwrap())
            .with("dten", Tensor::new([1, 2, 1], vec![9.0, -9.0]).unwrap())
    }

    #[test]
    fn example_message_layout() {
        let message = Message::new()
            .with("name", "abc")
            .with("count", 5)
            .with("ratio", 2.5);

        let (header, payload) = encode_message(&message).unwrap();
        assert_eq!(header, "name:s3;count:i;ratio:d");
        assert_eq!(payload.len(), 3 + 4 + 8);
        assert_eq!(&payload[..3], b"abc");
        assert_eq!(&payload[3..7], &5i32.to_le_bytes());
        assert_eq!(&payload[7..], &2.5f64.to_le_bytes());

        let decoded = decode_message(&header, &payload).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn every_kind_roundtrips_in_order() {
        let message = every_kind();
        let (header, payload) = encode_message(&message).unwrap();
        let decoded = decode_message(&header, &payload).unwrap();

        assert_eq!(decoded, message);
        let names: Vec<_> = decoded.names().collect();
        let expected: Vec<_> = message.names().collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn empty_message_has_empty_header() {
        let (header, payload) = encode_message(&Message::new()).unwrap();
        assert!(header.is_empty());
        assert!(payload.is_empty());
        assert!(decode_message("", &[]).unwrap().is_empty());
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut message = Message::new().with("a", 1).with("b", 2);
        assert_eq!(message.insert("a", 3), Some(Value::Int32(1)));
        let names: Vec<_> = message.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(message.get("a"), Some(&Value::Int32(3)));
        assert_eq!(message.remove("a"), Some(Value::Int32(3)));
        assert!(!message.contains("a"));
    }

    #[test]
    fn rejects_unrepresentable_field_names() {
        for name in ["", "a:b", "a;b"] {
            let message = Message::new().with(name, 1);
            assert!(matches!(
                encode_message(&message),
                Err(CodecError::InvalidFieldName(_))
            ));
        }
    }

    #[test]
    fn header_entry_without_separator_is_malformed() {
        let err = decode_message("count", &5i32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(entry) if entry == "count"));

        let err = decode_message(":i", &5i32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn premature_payload_exhaustion_is_truncation() {
        let err = decode_message("a:i;b:d", &[1, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { tag, .. } if tag == "d"));
    }

    #[test]
    fn leftover_payload_is_rejected() {
        let err = decode_message("a:i", &[1, 0, 0, 0, 9]).unwrap_err();
        assert!(matches!(err, CodecError::TrailingPayload { remaining: 1 }));
    }

    #[test]
    fn unknown_tag_in_header_is_lookup_error() {
        let err = decode_message("a:q4", &[0; 4]).unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(tag) if tag == "q4"));
    }

    #[test]
    fn colon_in_tag_position_splits_on_first() {
        let err = decode_message("a:s1:x", b"z").unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(tag) if tag == "s1:x"));
    }

    #[test]
    fn empty_containers_roundtrip() {
        let message = Message::new()
            .with("s", "")
            .with("b", Vec::<u8>::new())
            .with("i", Vec::<i32>::new())
            .with("d", Vec::<f64>::new())
            .with("m", Matrix::<f64>::new(0, 3, Vec::new()).unwrap());
        let (header, payload) = encode_message(&message).unwrap();
        assert_eq!(header, "s:s0;b:b0;i:i0;d:d0;m:md8");
        let decoded = decode_message(&header, &payload).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.get("i").map(Value::kind), Some(ValueKind::Int32Array));
    }

    #[test]
    fn serializes_as_ordered_map() {
        let message = Message::new().with("z", 1).with("a", "x");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(
            json,
            r#"{"z":{"type":"int32","value":1},"a":{"type":"string","value":"x"}}"#
        );
    }

    #[test]
    fn collects_from_pairs() {
        let message: Message = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(message.len(), 2);
        let pairs: Vec<_> = message.into_iter().map(|(n, _)| n).collect();
        assert_eq!(pairs, ["a", "b"]);
    }
}
