//! The line-oriented, JSON-framed protocol dispatcher: one command per
//! line on stdin, one pretty-printed JSON reply per line on stdout.
//!
//! The wire framing of replies is this crate's own design (the JSON shape of
//! protocol messages, beyond the event payload schema, is deliberately left
//! unspecified upstream); only the event payload schema and the command set
//! are load-bearing.

use crate::diff::EventKind;
use crate::enumerator;
use crate::error::DiscoveryError;
use crate::port::PortJson;
use crate::session::SyncController;
use crate::version::Info;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Serialize)]
#[serde(untagged)]
enum Reply {
    Status { error: bool, message: String },
    Ports { ports: Vec<PortJson> },
    Event { event_type: &'static str, port: PortJson },
}

impl Reply {
    fn ok() -> Self {
        Reply::Status {
            error: false,
            message: "OK".to_string(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Reply::Status {
            error: true,
            message: message.into(),
        }
    }
}

/// Drives the protocol loop. Holds the one [`SyncController`] a process may
/// run and the output lock that keeps asynchronous event records from
/// interleaving with synchronous command replies.
pub struct Dispatcher<R, W> {
    input: R,
    output: Arc<Mutex<W>>,
    controller: Arc<SyncController>,
}

impl<R, W> std::fmt::Debug for Dispatcher<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("controller", &self.controller)
            .finish()
    }
}

impl<R: BufRead, W: Write + Send + 'static> Dispatcher<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Dispatcher {
            input,
            output: Arc::new(Mutex::new(output)),
            controller: Arc::new(SyncController::new()),
        }
    }

    /// Read commands until EOF or `QUIT`. Returns `Err` only for a fatal I/O
    /// failure reading stdin.
    pub fn run(mut self) -> Result<(), DiscoveryError> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.input.read_line(&mut line)?;
            if n == 0 {
                return Ok(());
            }
            let command = line.trim_end();
            if command.is_empty() {
                continue;
            }
            if !self.dispatch(command) {
                return Ok(());
            }
        }
    }

    /// Handle one command line. Returns `false` when the loop should stop
    /// (i.e. after `QUIT`).
    fn dispatch(&mut self, command: &str) -> bool {
        let mut parts = command.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default().to_ascii_uppercase();
        let rest = parts.next().unwrap_or_default();

        match verb.as_str() {
            "HELLO" => {
                info!(args = rest, "handshake");
                self.write_reply(&Reply::ok());
            }
            "START" => self.write_reply(&Reply::ok()),
            "STOP" => {
                self.controller.stop();
                self.write_reply(&Reply::ok());
            }
            "LIST" => match enumerator::enumerate() {
                Ok(ports) => {
                    let ports = ports.iter().map(PortJson::full).collect();
                    self.write_reply(&Reply::Ports { ports });
                }
                Err(err) => self.write_reply(&Reply::error(err.to_string())),
            },
            "START_SYNC" => {
                let event_output = Arc::clone(&self.output);
                let event_cb: crate::watcher::EventCb = Arc::new(move |kind, port| {
                    write_locked(
                        &event_output,
                        &Reply::Event {
                            event_type: event_kind_label(kind),
                            port,
                        },
                    );
                });
                let error_output = Arc::clone(&self.output);
                let error_cb: crate::watcher::ErrorCb = Arc::new(move |message| {
                    write_locked(&error_output, &Reply::error(message));
                });
                match self.controller.start(event_cb, error_cb) {
                    Ok(()) => self.write_reply(&Reply::ok()),
                    Err(err) => self.write_reply(&Reply::error(err.to_string())),
                }
            }
            "QUIT" => {
                self.write_reply(&Reply::ok());
                return false;
            }
            other => {
                warn!(command = other, "unrecognized command");
                self.write_reply(&Reply::error(format!("command_error: unknown command {other}")));
            }
        }
        true
    }

    fn write_reply(&self, reply: &Reply) {
        write_locked(&self.output, reply);
    }
}

fn event_kind_label(kind: EventKind) -> &'static str {
    kind.as_str()
}

fn write_locked<W: Write>(output: &Mutex<W>, reply: &Reply) {
    let mut out = output.lock();
    if let Err(err) = serde_json::to_writer_pretty(&mut *out, reply) {
        tracing::error!(%err, "failed to write protocol reply");
        return;
    }
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Prints the one-line version string for `-v`/`--version`.
pub fn version_line() -> String {
    Info::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn hello_and_quit_round_trip() {
        let input = Cursor::new(b"HELLO 1 \"test\"\nQUIT\n".to_vec());
        let output = Vec::new();
        let dispatcher = Dispatcher::new(input, output);
        dispatcher.run().unwrap();
    }

    #[test]
    fn unknown_command_does_not_stop_the_loop() {
        let input = Cursor::new(b"BOGUS\nQUIT\n".to_vec());
        let output = Vec::new();
        let dispatcher = Dispatcher::new(input, output);
        dispatcher.run().unwrap();
    }

    #[test]
    fn eof_without_quit_ends_the_loop_cleanly() {
        let input = Cursor::new(b"HELLO 1 \"test\"\n".to_vec());
        let output = Vec::new();
        let dispatcher = Dispatcher::new(input, output);
        dispatcher.run().unwrap();
    }
}
