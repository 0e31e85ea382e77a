//! The sync session controller: `START_SYNC` spins one up, `STOP_SYNC` (or
//! dropping the last handle) tears it down. Only one session runs at a time.

use crate::diff::{diff, EventKind};
use crate::enumerator;
use crate::error::DiscoveryError;
use crate::port::PortJson;
use crate::watcher::{self, ErrorCb, EventCb, StopSignal, WatcherWorker};
use parking_lot::Mutex;
use std::sync::Arc;

struct Running {
    stop: Arc<StopSignal>,
    worker: WatcherWorker,
}

enum State {
    Idle,
    Running(Running),
}

/// Owns at most one running watcher session.
///
/// `start` is a no-op returning `Ok(())` while a session is already running
/// (mirrors the upstream agent's "only one StartSync at a time" behavior:
/// a reinvocation observes the already-running session rather than erroring
/// or spawning a second watcher). `stop` is idempotent: calling it with no
/// session running is a no-op.
pub struct SyncController {
    state: Mutex<State>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running = matches!(&*self.state.lock(), State::Running(_));
        f.debug_struct("SyncController")
            .field("running", &running)
            .finish()
    }
}

impl SyncController {
    pub fn new() -> Self {
        SyncController {
            state: Mutex::new(State::Idle),
        }
    }

    /// `true` if a session is currently running.
    pub fn is_running(&self) -> bool {
        matches!(&*self.state.lock(), State::Running(_))
    }

    /// Enumerate the current ports, emit one synthetic `add` event per port
    /// through `event_cb`, then start watching for changes. Every further
    /// add/remove is reported through `event_cb`; out-of-band errors that do
    /// not kill the watcher go through `error_cb`. A call while a session is
    /// already running is a no-op that returns `Ok(())` without re-spawning.
    pub fn start(&self, event_cb: EventCb, error_cb: ErrorCb) -> Result<(), DiscoveryError> {
        self.start_with(watcher::spawn, event_cb, error_cb)
    }

    /// The guts of `start`, parameterized over the watcher-spawning function
    /// so tests can exercise the single-session state machine without
    /// touching real OS notification sources.
    fn start_with(
        &self,
        spawn_fn: impl FnOnce(
            Vec<crate::port::PortDescriptor>,
            Arc<StopSignal>,
            EventCb,
            ErrorCb,
        ) -> Result<WatcherWorker, DiscoveryError>,
        event_cb: EventCb,
        error_cb: ErrorCb,
    ) -> Result<(), DiscoveryError> {
        let mut state = self.state.lock();
        if matches!(&*state, State::Running(_)) {
            return Ok(());
        }

        let initial = enumerator::enumerate()?;
        for port in &initial {
            event_cb(EventKind::Add, PortJson::full(port));
        }

        let stop = Arc::new(StopSignal::new());
        let worker = spawn_fn(initial, Arc::clone(&stop), event_cb, error_cb)
            .map_err(|err| DiscoveryError::Start(err.to_string()))?;

        *state = State::Running(Running { stop, worker });
        Ok(())
    }

    /// Signal shutdown and block until every watcher thread has exited. No
    /// `event_cb`/`error_cb` invocation can happen after this returns.
    pub fn stop(&self) {
        let running = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Idle) {
                State::Running(running) => Some(running),
                State::Idle => None,
            }
        };
        if let Some(running) = running {
            running.stop.signal();
            running.worker.join();
        }
    }
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply the diff algorithm between two enumerations, invoking `event_cb` for
/// each change. Used by watchers that only know "something changed" (Linux,
/// Windows) rather than precisely what (macOS does the same after its
/// timeout-driven poll).
pub fn reconcile(
    previous: &[crate::port::PortDescriptor],
    current: &[crate::port::PortDescriptor],
    event_cb: &EventCb,
) {
    diff(previous, current, |kind, port| event_cb(kind, port));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn stop_without_start_is_a_no_op() {
        let controller = SyncController::new();
        controller.stop();
        assert!(!controller.is_running());
    }

    #[test]
    fn reinvoking_start_while_running_does_not_spawn_a_second_worker() {
        let controller = SyncController::new();
        let spawn_calls = Arc::new(AtomicUsize::new(0));

        let fake_spawn = |calls: Arc<AtomicUsize>| {
            move |_initial: Vec<crate::port::PortDescriptor>,
                  _stop: Arc<StopSignal>,
                  _event_cb: EventCb,
                  _error_cb: ErrorCb|
                  -> Result<WatcherWorker, DiscoveryError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(WatcherWorker::new(vec![std::thread::spawn(|| {})]))
            }
        };

        let noop_event_cb: EventCb = Arc::new(|_kind, _port| {});
        let noop_error_cb: ErrorCb = Arc::new(|_message| {});

        let first = controller.start_with(
            fake_spawn(Arc::clone(&spawn_calls)),
            Arc::clone(&noop_event_cb),
            Arc::clone(&noop_error_cb),
        );
        assert!(first.is_ok());
        assert!(controller.is_running());
        assert_eq!(spawn_calls.load(Ordering::SeqCst), 1);

        let second = controller.start_with(
            fake_spawn(Arc::clone(&spawn_calls)),
            noop_event_cb,
            noop_error_cb,
        );
        assert!(second.is_ok());
        assert_eq!(spawn_calls.load(Ordering::SeqCst), 1);

        controller.stop();
        assert!(!controller.is_running());
    }

    #[test]
    fn reconcile_invokes_event_cb_once_per_change() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let event_cb: EventCb = Arc::new(move |_kind, _port| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let old: Vec<crate::port::PortDescriptor> = vec![];
        let new = vec![crate::port::PortDescriptor {
            address: "/dev/ttyACM0".to_string(),
            is_usb: false,
            vid: None,
            pid: None,
            serial_number: None,
        }];
        reconcile(&old, &new, &event_cb);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
