use std::sync::mpsc;

use kvlink_codec::Message;
use kvlink_endpoint::{Receiver, ReceiverConfig, ReceiverEvent, ReceiverHandler, Sender};
use tracing::{debug, info, warn};

use crate::cmd::{install_ctrlc_handler, parse_endpoint, RelayArgs};
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Forwards each received message from the worker thread that decoded it.
struct Forwarder {
    sender: Sender,
    forwarded: mpsc::Sender<u64>,
}

impl ReceiverHandler for Forwarder {
    fn message_received(&self, client_id: u64, message: &Message) {
        match self.sender.send(message) {
            Ok(()) => {
                debug!(client_id, to = self.sender.addr(), "message forwarded");
                let _ = self.forwarded.send(client_id);
            }
            Err(err) => warn!(client_id, to = self.sender.addr(), error = %err, "forward failed"),
        }
    }
}

pub fn run(args: RelayArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.addr)?;
    let (to_host, to_port) = parse_endpoint(&args.to)?;
    let sender =
        Sender::new(&to_host, to_port).map_err(|err| endpoint_error("invalid target", err))?;

    let mut receiver = Receiver::new(ReceiverConfig::new(host, port))
        .map_err(|err| endpoint_error("invalid listener", err))?;
    let (forwarded, forwarded_rx) = mpsc::channel();
    let (events, rx) = mpsc::channel();
    receiver.subscribe(Forwarder { sender, forwarded });
    receiver.subscribe(events);
    receiver
        .start()
        .map_err(|err| endpoint_error("listen failed", err))?;
    install_ctrlc_handler(receiver.stop_handle())?;
    info!(addr = %args.addr, to = %args.to, "relaying");

    // The forwarder is registered first, so a client's forward has finished
    // by the time its MessageReceived event arrives here.
    let mut relayed = 0usize;
    while let Ok(event) = rx.recv() {
        match event {
            ReceiverEvent::MessageReceived { client_id, message } => {
                print_message(client_id, &message, format);
            }
            ReceiverEvent::ConnectionFailed { client_id, error } => {
                warn!(client_id, %error, "connection failed");
            }
            ReceiverEvent::ListeningStopped => break,
            _ => {}
        }
        relayed = relayed.saturating_add(forwarded_rx.try_iter().count());
        if args.count.is_some_and(|count| relayed >= count) {
            break;
        }
    }

    let _ = receiver.stop();
    receiver
        .wait()
        .map_err(|err| endpoint_error("relay failed", err))?;
    Ok(SUCCESS)
}
