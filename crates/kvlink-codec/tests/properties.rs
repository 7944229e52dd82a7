//! Property tests for the message codec.

use kvlink_codec::{decode_message, encode_message, Matrix, Message, Tensor, TypeRegistry, Value};
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<f64>().prop_map(Value::Float64),
        ".{0,24}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
        prop::collection::vec(any::<i32>(), 0..16).prop_map(Value::Int32Array),
        prop::collection::vec(any::<f64>(), 0..16).prop_map(Value::Float64Array),
        (0usize..4, 0usize..4).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(any::<i32>(), rows * cols).prop_map(move |data| {
                Value::Int32Matrix(Matrix::new(rows, cols, data).unwrap())
            })
        }),
        (0usize..4, 0usize..4).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(any::<f64>(), rows * cols).prop_map(move |data| {
                Value::Float64Matrix(Matrix::new(rows, cols, data).unwrap())
            })
        }),
        (0usize..3, 0usize..3, 0usize..3).prop_flat_map(|(a, b, c)| {
            prop::collection::vec(any::<i32>(), a * b * c)
                .prop_map(move |data| Value::Int32Tensor(Tensor::new([a, b, c], data).unwrap()))
        }),
        (0usize..3, 0usize..3, 0usize..3).prop_flat_map(|(a, b, c)| {
            prop::collection::vec(any::<f64>(), a * b * c)
                .prop_map(move |data| Value::Float64Tensor(Tensor::new([a, b, c], data).unwrap()))
        }),
    ]
}

fn message_strategy() -> impl Strategy<Value = Message> {
    prop::collection::vec(("[a-zA-Z_][a-zA-Z0-9_.]{0,11}", value_strategy()), 0..12)
        .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #[test]
    fn message_roundtrips(message in message_strategy()) {
        let (header, payload) = encode_message(&message).unwrap();
        let decoded = decode_message(&header, &payload).unwrap();
        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn header_lengths_cover_payload_exactly(message in message_strategy()) {
        let (header, payload) = encode_message(&message).unwrap();
        let registry = TypeRegistry::standard();
        let declared: usize = if header.is_empty() {
            0
        } else {
            header
                .split(';')
                .map(|entry| {
                    let (_, tag) = entry.split_once(':').unwrap();
                    registry.byte_len(tag).unwrap()
                })
                .sum()
        };
        prop_assert_eq!(declared, payload.len());
    }

    #[test]
    fn decoding_arbitrary_input_never_panics(
        header in "([a-z]{1,4}:(n|b|i|d|s[0-9]{1,2}|b[0-9]{1,2}|i[0-9]{1,2}|mi[0-9]{1,2}|md[0-9]{1,2}|mmd[0-9]{1,2}|x);?){0,6}",
        payload in prop::collection::vec(any::<u8>(), 0..96),
    ) {
        let _ = decode_message(&header, &payload);
    }

    #[test]
    fn truncated_payload_fails(message in message_strategy(), cut in 1usize..8) {
        let (header, payload) = encode_message(&message).unwrap();
        prop_assume!(!payload.is_empty());
        let keep = payload.len().saturating_sub(cut);
        prop_assert!(decode_message(&header, &payload[..keep]).is_err());
    }
}
