use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kvlink_codec::{Message, Value};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    client_id: u64,
    field_count: usize,
    message: &'a Message,
    timestamp: String,
}

#[derive(Serialize)]
struct SentOutput<'a> {
    addr: &'a str,
    field_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<i32>,
    timestamp: String,
}

/// Print one received message.
pub fn print_message(client_id: u64, message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                client_id,
                field_count: message.len(),
                message,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CLIENT", "FIELD", "TYPE", "VALUE"]);
            for (name, value) in message.iter() {
                table.add_row(vec![
                    client_id.to_string(),
                    name.to_string(),
                    value.kind().to_string(),
                    value_preview(value),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = message
                .iter()
                .map(|(name, value)| format!("{name}={}", value_preview(value)))
                .collect();
            println!("client={client_id} {}", fields.join(" "));
        }
    }
}

/// Print the outcome of a successful send.
pub fn print_sent(addr: &str, field_count: usize, request_id: Option<i32>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                addr,
                field_count,
                request_id,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDR", "FIELDS", "REQUEST ID"])
                .add_row(vec![
                    addr.to_string(),
                    field_count.to_string(),
                    request_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match request_id {
            Some(id) => println!("sent {field_count} fields to {addr} (rid={id})"),
            None => println!("sent {field_count} fields to {addr}"),
        },
    }
}

pub fn value_preview(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::String(v) => format!("{v:?}"),
        Value::Bytes(v) => format!("<{} bytes>", v.len()),
        Value::Int32Array(v) => format!("{v:?}"),
        Value::Float64Array(v) => format!("{v:?}"),
        Value::Int32Matrix(m) => format!("{}x{} {:?}", m.rows(), m.cols(), m.data()),
        Value::Float64Matrix(m) => format!("{}x{} {:?}", m.rows(), m.cols(), m.data()),
        Value::Int32Tensor(t) => {
            let [a, b, c] = t.dims();
            format!("{a}x{b}x{c} {:?}", t.data())
        }
        Value::Float64Tensor(t) => {
            let [a, b, c] = t.dims();
            format!("{a}x{b}x{c} {:?}", t.data())
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
