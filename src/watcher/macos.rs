//! The macOS watcher: a kqueue `EVFILT_VNODE` watch on `/dev`, polled with a
//! 100 ms timeout so the stop signal can be observed without a waker.

use super::{ErrorCb, EventCb, StopSignal, WatcherWorker};
use crate::enumerator;
use crate::error::DiscoveryError;
use crate::port::PortDescriptor;
use crate::session::reconcile;
use nix::fcntl::{open, OFlag};
use nix::sys::event::{kevent_ts, kqueue, EventFilter, FilterFlag, KEvent};
use nix::sys::stat::Mode;
use nix::sys::time::TimeSpec;
use std::os::unix::io::{AsRawFd, BorrowedFd};
use std::sync::Arc;
use tracing::error;

const RETRY_BUDGET: u8 = 5;

fn poll_timeout() -> TimeSpec {
    TimeSpec::new(0, 100_000_000)
}

pub fn spawn(
    initial: Vec<PortDescriptor>,
    stop: Arc<StopSignal>,
    event_cb: EventCb,
    error_cb: ErrorCb,
) -> Result<WatcherWorker, DiscoveryError> {
    let dev_fd = open("/dev", OFlag::O_RDONLY | OFlag::O_EVTONLY, Mode::empty())
        .map_err(|err| DiscoveryError::Start(err.to_string()))?;
    let kq = kqueue().map_err(|err| DiscoveryError::Start(err.to_string()))?;

    // The initial snapshot's "add" events are emitted once by the session
    // controller before `spawn` is called; this watcher only reports
    // changes observed after that point.
    let handle = std::thread::spawn(move || {
        run(dev_fd, kq, initial, &stop, &event_cb, &error_cb);
    });

    Ok(WatcherWorker::new(vec![handle]))
}

fn watch_event(dev_fd: i32) -> KEvent {
    KEvent::new(
        dev_fd as usize,
        EventFilter::EVFILT_VNODE,
        nix::sys::event::EventFlag::EV_ADD | nix::sys::event::EventFlag::EV_ENABLE | nix::sys::event::EventFlag::EV_ONESHOT,
        FilterFlag::NOTE_DELETE | FilterFlag::NOTE_WRITE,
        0,
        0,
    )
}

fn run(
    dev_fd: std::os::unix::io::OwnedFd,
    kq: std::os::unix::io::OwnedFd,
    initial: Vec<PortDescriptor>,
    stop: &StopSignal,
    event_cb: &EventCb,
    error_cb: &ErrorCb,
) {
    let mut last_snapshot = initial;
    let change = [watch_event(dev_fd.as_raw_fd())];
    let mut triggered = [KEvent::new(
        0,
        EventFilter::EVFILT_VNODE,
        nix::sys::event::EventFlag::empty(),
        FilterFlag::empty(),
        0,
        0,
    )];

    let kq_fd = unsafe { BorrowedFd::borrow_raw(kq.as_raw_fd()) };

    loop {
        if stop.is_stopped() {
            return;
        }

        let wake_count = match kevent_ts(kq_fd, &change, &mut triggered, Some(poll_timeout())) {
            Ok(count) => count,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(err) => {
                if !stop.is_stopped() {
                    error_cb(err.to_string());
                }
                return;
            }
        };

        if stop.is_stopped() {
            return;
        }

        if wake_count == 0 {
            continue;
        }

        let mut retries_left = RETRY_BUDGET;
        while retries_left > 0 {
            retries_left -= 1;
            match enumerator::enumerate() {
                Ok(current) => {
                    reconcile(&last_snapshot, &current, event_cb);
                    last_snapshot = current;
                }
                Err(err) => {
                    error!(%err, "enumeration failed inside macOS retry window, swallowing");
                }
            }
        }
    }
}
