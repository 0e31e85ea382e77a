//! The Linux watcher: a udev netlink monitor filtered to the `tty`
//! subsystem, polled with `mio`.

use super::{ErrorCb, EventCb, StopSignal, WatcherWorker};
use crate::diff::EventKind;
use crate::enumerator;
use crate::error::DiscoveryError;
use crate::port::{PortDescriptor, PortJson};
use mio::{Events, Interest, Token, Waker};
use std::sync::Arc;
use tracing::{error, trace, warn};

const SOCKET_TOKEN: Token = Token(0);
const WAKE_TOKEN: Token = Token(1);

pub fn spawn(
    _initial: Vec<PortDescriptor>,
    stop: Arc<StopSignal>,
    event_cb: EventCb,
    error_cb: ErrorCb,
) -> Result<WatcherWorker, DiscoveryError> {
    let mut socket = udev::MonitorBuilder::new()
        .map_err(|err| DiscoveryError::Start(err.to_string()))?
        .match_subsystem("tty")
        .map_err(|err| DiscoveryError::Start(err.to_string()))?
        .listen()
        .map_err(|err| DiscoveryError::Start(err.to_string()))?;

    let poll = mio::Poll::new().map_err(|err| DiscoveryError::Start(err.to_string()))?;
    poll.registry()
        .register(&mut socket, SOCKET_TOKEN, Interest::READABLE)
        .map_err(|err| DiscoveryError::Start(err.to_string()))?;
    let waker =
        Waker::new(poll.registry(), WAKE_TOKEN).map_err(|err| DiscoveryError::Start(err.to_string()))?;
    let waker = Arc::new(waker);
    let waker_clone = Arc::clone(&waker);
    stop.set_waker(Box::new(move || {
        if let Err(err) = waker_clone.wake() {
            error!(%err, "failed to wake linux watcher");
        }
    }));

    // The initial snapshot's "add" events are emitted once by the session
    // controller before `spawn` is called; this watcher only reports
    // changes observed after that point.
    let handle = std::thread::spawn(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run(socket, poll, &stop, &event_cb, &error_cb)
        }));
        if let Err(panic) = result {
            if stop.is_stopped() {
                trace!("linux watcher panicked during shutdown, ignoring");
            } else {
                error_cb(format!("watcher panic: {:?}", panic));
            }
        }
    });

    Ok(WatcherWorker::new(vec![handle]))
}

fn run(
    mut socket: udev::MonitorSocket,
    mut poll: mio::Poll,
    stop: &StopSignal,
    event_cb: &EventCb,
    error_cb: &ErrorCb,
) {
    let mut events = Events::with_capacity(64);
    loop {
        match poll.poll(&mut events, None) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                if !stop.is_stopped() {
                    error_cb(err.to_string());
                }
                return;
            }
        }

        if stop.is_stopped() {
            return;
        }

        for event in &events {
            if event.token() == WAKE_TOKEN {
                if stop.is_stopped() {
                    return;
                }
            } else if event.token() == SOCKET_TOKEN && event.is_readable() {
                for dev_event in socket.iter() {
                    handle_uevent(&dev_event, event_cb);
                }
            }
        }
    }
}

fn handle_uevent(dev_event: &udev::Event, event_cb: &EventCb) {
    let device = dev_event.device();
    let subsystem = device.subsystem().and_then(|s| s.to_str());
    if subsystem != Some("tty") {
        return;
    }
    let devname = match device.devnode().and_then(|p| p.to_str()) {
        Some(path) => path.to_string(),
        None => return,
    };

    match dev_event.event_type() {
        udev::EventType::Add => {
            let Ok(ports) = enumerator::enumerate() else {
                return;
            };
            if let Some(port) = ports.iter().find(|p| p.address == devname && p.is_usb) {
                event_cb(EventKind::Add, PortJson::full(port));
            }
        }
        udev::EventType::Remove => {
            event_cb(EventKind::Remove, PortJson::minimal(devname));
        }
        other => {
            warn!(?other, "ignoring uevent");
        }
    }
}
