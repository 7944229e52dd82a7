use clap::{ArgGroup, Args, Subcommand};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod listen;
pub mod relay;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a receiver and print every message it gets.
    Listen(ListenArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Forward every received message to another receiver.
    Relay(RelayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Relay(args) => relay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to listen on (HOST:PORT).
    pub addr: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connections served concurrently.
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["json", "fields"])))]
pub struct SendArgs {
    /// Receiver address (HOST:PORT).
    pub addr: String,
    /// Message as a JSON object.
    #[arg(long)]
    pub json: Option<String>,
    /// One field as NAME=VALUE. VALUE is parsed as JSON, else sent as a string.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
    /// Stamp the message with a request id field.
    #[arg(long)]
    pub request_id: bool,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Address to listen on (HOST:PORT).
    pub addr: String,
    /// Receiver to forward to (HOST:PORT).
    #[arg(long, value_name = "HOST:PORT")]
    pub to: String,
    /// Exit after forwarding N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Split `HOST:PORT`, accepting a bracketed IPv6 host.
pub fn parse_endpoint(input: &str) -> CliResult<(String, u16)> {
    let (host, port) = input
        .rsplit_once(':')
        .ok_or_else(|| CliError::usage(format!("{input:?} is not HOST:PORT")))?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(CliError::usage(format!("{input:?} has no host")));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| CliError::usage(format!("{input:?} has an invalid port")))?;
    if port == 0 {
        return Err(CliError::usage(format!("{input:?}: port must be positive")));
    }
    Ok((host.to_string(), port))
}

/// Stop the receiver behind `stop` when the process gets Ctrl-C.
pub fn install_ctrlc_handler(stop: kvlink_endpoint::StopHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = stop.stop();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoints() {
        assert_eq!(
            parse_endpoint("localhost:7007").unwrap(),
            ("localhost".to_string(), 7007)
        );
        assert_eq!(parse_endpoint("[::1]:80").unwrap(), ("::1".to_string(), 80));
    }

    #[test]
    fn rejects_bad_endpoints() {
        for input in ["localhost", ":7007", "host:0", "host:http", "host:70000"] {
            let err = parse_endpoint(input).unwrap_err();
            assert_eq!(err.code, crate::exit::USAGE, "{input}");
        }
    }
}
