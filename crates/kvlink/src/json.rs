//! JSON input for `send`.
//!
//! Integer literals that fit Int32 become `Int32`, every other number
//! becomes `Float64`. Arrays nested one, two or three deep become arrays,
//! matrices and tensors; the whole container is Int32 only if every element
//! qualifies.

use kvlink_codec::{Matrix, Message, Tensor, Value};
use serde_json::Value as Json;

use crate::exit::{CliError, CliResult};

/// Build a message from a JSON object, keeping the object's field order.
pub fn message_from_json(text: &str) -> CliResult<Message> {
    let json: Json = serde_json::from_str(text)
        .map_err(|err| CliError::usage(format!("--json is not valid JSON: {err}")))?;
    let Json::Object(object) = json else {
        return Err(CliError::usage("--json must be a JSON object"));
    };

    let mut message = Message::with_capacity(object.len());
    for (name, value) in object {
        let value = value_from_json(&value)
            .map_err(|reason| CliError::usage(format!("field {name:?}: {reason}")))?;
        message.insert(name, value);
    }
    Ok(message)
}

/// Build a message from `NAME=VALUE` arguments. A value that does not
/// parse as JSON is sent as a string.
pub fn message_from_fields(fields: &[String]) -> CliResult<Message> {
    let mut message = Message::with_capacity(fields.len());
    for field in fields {
        let (name, raw) = field
            .split_once('=')
            .ok_or_else(|| CliError::usage(format!("--field {field:?} is not NAME=VALUE")))?;
        let value = match serde_json::from_str::<Json>(raw) {
            Ok(json) => value_from_json(&json)
                .map_err(|reason| CliError::usage(format!("field {name:?}: {reason}")))?,
            Err(_) => Value::from(raw),
        };
        message.insert(name, value);
    }
    Ok(message)
}

pub fn value_from_json(json: &Json) -> Result<Value, String> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(v) => Ok(Value::Bool(*v)),
        Json::Number(_) => Ok(as_int(json)
            .map(Value::Int32)
            .or_else(|| as_float(json).map(Value::Float64))
            .unwrap_or(Value::Null)),
        Json::String(v) => Ok(Value::String(v.clone())),
        Json::Array(items) => array_value(items),
        Json::Object(_) => Err("nested objects are not supported".to_string()),
    }
}

fn array_value(items: &[Json]) -> Result<Value, String> {
    match array_depth(items) {
        1 => match to_vec(items, as_int) {
            Ok(values) => Ok(Value::Int32Array(values)),
            Err(_) => to_vec(items, as_float).map(Value::Float64Array),
        },
        2 => match to_rows(items, as_int) {
            Ok(rows) => Matrix::from_rows(rows).map(Value::from),
            Err(_) => Matrix::from_rows(to_rows(items, as_float)?).map(Value::from),
        }
        .map_err(|err| err.to_string()),
        3 => match to_planes(items, as_int) {
            Ok(planes) => Tensor::from_nested(planes).map(Value::from),
            Err(_) => Tensor::from_nested(to_planes(items, as_float)?).map(Value::from),
        }
        .map_err(|err| err.to_string()),
        depth => Err(format!("arrays nested {depth} deep are not supported")),
    }
}

// Depth follows the first element; ragged nesting fails during conversion.
fn array_depth(items: &[Json]) -> usize {
    match items.first() {
        Some(Json::Array(inner)) => 1 + array_depth(inner),
        _ => 1,
    }
}

fn as_int(json: &Json) -> Option<i32> {
    json.as_i64().and_then(|n| i32::try_from(n).ok())
}

fn as_float(json: &Json) -> Option<f64> {
    json.as_f64()
}

fn to_vec<T>(items: &[Json], leaf: fn(&Json) -> Option<T>) -> Result<Vec<T>, String> {
    items
        .iter()
        .map(|item| leaf(item).ok_or_else(|| format!("expected a number, found {item}")))
        .collect()
}

fn to_rows<T>(items: &[Json], leaf: fn(&Json) -> Option<T>) -> Result<Vec<Vec<T>>, String> {
    items
        .iter()
        .map(|row| match row {
            Json::Array(row) => to_vec(row, leaf),
            other => Err(format!("expected an array, found {other}")),
        })
        .collect()
}

fn to_planes<T>(items: &[Json], leaf: fn(&Json) -> Option<T>) -> Result<Vec<Vec<Vec<T>>>, String> {
    items
        .iter()
        .map(|plane| match plane {
            Json::Array(plane) => to_rows(plane, leaf),
            other => Err(format!("expected an array, found {other}")),
        })
        .collect()
}
