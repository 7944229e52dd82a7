use std::sync::mpsc;

use kvlink_endpoint::{Receiver, ReceiverConfig, ReceiverEvent};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_endpoint, ListenArgs};
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.addr)?;
    let mut config = ReceiverConfig::new(host, port);
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let mut receiver =
        Receiver::new(config).map_err(|err| endpoint_error("invalid listener", err))?;
    let (events, rx) = mpsc::channel();
    receiver.subscribe(events);
    receiver
        .start()
        .map_err(|err| endpoint_error("listen failed", err))?;
    install_ctrlc_handler(receiver.stop_handle())?;
    info!(addr = %args.addr, "listening");

    let mut printed = 0usize;
    while let Ok(event) = rx.recv() {
        match event {
            ReceiverEvent::MessageReceived { client_id, message } => {
                print_message(client_id, &message, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            ReceiverEvent::ConnectionFailed { client_id, error } => {
                warn!(client_id, %error, "connection failed");
            }
            ReceiverEvent::ListeningStopped => break,
            _ => {}
        }
    }

    // Ctrl-C may already have stopped it.
    let _ = receiver.stop();
    receiver
        .wait()
        .map_err(|err| endpoint_error("listener failed", err))?;
    Ok(SUCCESS)
}
