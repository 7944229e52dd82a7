mod cmd;
mod exit;
mod json;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kvlink", version, about = "Send and receive typed key-value messages over TCP")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "KVLINK_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "kvlink",
            "send",
            "127.0.0.1:7007",
            "--field",
            "name=abc",
            "--field",
            "count=5",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => assert_eq!(args.fields, vec!["name=abc", "count=5"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "kvlink",
            "send",
            "127.0.0.1:7007",
            "--json",
            "{\"x\":1}",
            "--field",
            "y=2",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_a_payload() {
        let err = Cli::try_parse_from(["kvlink", "send", "127.0.0.1:7007"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_relay_subcommand() {
        let cli = Cli::try_parse_from([
            "kvlink",
            "--log-level",
            "debug",
            "relay",
            "0.0.0.0:7007",
            "--to",
            "10.0.0.2:7008",
        ])
        .expect("relay args should parse");
        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert!(matches!(cli.command, Command::Relay(_)));
    }

    #[test]
    fn relay_requires_target() {
        let err = Cli::try_parse_from(["kvlink", "relay", "0.0.0.0:7007"])
            .expect_err("missing --to should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
