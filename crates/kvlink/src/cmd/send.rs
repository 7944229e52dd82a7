use std::time::Duration;

use kvlink_codec::Message;
use kvlink_endpoint::{Sender, SenderConfig};

use crate::cmd::{parse_endpoint, SendArgs};
use crate::exit::{endpoint_error, CliError, CliResult, SUCCESS};
use crate::json::{message_from_fields, message_from_json};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.addr)?;
    let config = SenderConfig {
        connect_timeout: Some(parse_duration(&args.timeout)?),
        ..SenderConfig::default()
    };
    let sender = Sender::with_config(&host, port, config)
        .map_err(|err| endpoint_error("invalid target", err))?;

    let message = resolve_message(&args)?;
    let stamped = args.request_id && !message.contains(&sender.config().request_id_field);
    let field_count = message.len() + usize::from(stamped);

    let request_id = if args.request_id {
        let id = sender
            .send_with_request_id(message)
            .map_err(|err| endpoint_error("send failed", err))?;
        Some(id)
    } else {
        sender
            .send(&message)
            .map_err(|err| endpoint_error("send failed", err))?;
        None
    };

    print_sent(sender.addr(), field_count, request_id, format);
    Ok(SUCCESS)
}

fn resolve_message(args: &SendArgs) -> CliResult<Message> {
    match &args.json {
        Some(json) => message_from_json(json),
        None => message_from_fields(&args.fields),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
