//! The platform watcher abstraction.
//!
//! A watcher is polymorphic over the capability set
//! `start(initial_snapshot, stop_signal, event_cb, error_cb) -> worker_handle`;
//! the three platform variants (`linux`, `macos`, `windows`) have resource
//! lifetimes different enough — a udev netlink socket, a kqueue plus a `/dev`
//! fd, an OS-pinned message-only window — that a single runtime-dispatched
//! implementation is not attempted. `cfg(target_os = ...)` selects the
//! variant at build time instead.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod windows;

use crate::diff::EventKind;
use crate::error::DiscoveryError;
use crate::port::{PortDescriptor, PortJson};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Invoked once per add/remove event, from whichever watcher thread observed
/// it. Must be safe to call concurrently with itself and with `ErrorCb`.
pub type EventCb = Arc<dyn Fn(EventKind, PortJson) + Send + Sync>;

/// Invoked for recoverable runtime errors after a session has started.
pub type ErrorCb = Arc<dyn Fn(String) + Send + Sync>;

/// A single-shot, cooperative shutdown signal shared between the session
/// controller and a running watcher.
///
/// Every platform checks the flag; some platforms also need to interrupt a
/// blocking wait, so the signal additionally carries an optional wake
/// callback that the watcher installs once its blocking primitive exists
/// (a `mio::Waker` on Linux, a `PostMessageW(WM_CLOSE)` on Windows). macOS
/// needs no wake callback: its `kevent` wait already has a 100 ms timeout.
pub struct StopSignal {
    flag: AtomicBool,
    wake: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal {
            flag: AtomicBool::new(false),
            wake: Mutex::new(None),
        }
    }

    /// Install the callback that interrupts the watcher's blocking wait.
    /// Only meaningful if called before [`StopSignal::signal`].
    pub fn set_waker(&self, wake: Box<dyn Fn() + Send>) {
        *self.wake.lock() = Some(wake);
    }

    /// Request shutdown. Idempotent: calling this more than once just
    /// re-invokes the wake callback.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Some(wake) = self.wake.lock().as_ref() {
            wake();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The join handles for every thread a watcher spawned. Dropping this
/// without calling [`WatcherWorker::join`] would leak running threads, so the
/// session controller always joins before returning from `stop()`.
pub struct WatcherWorker {
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WatcherWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherWorker")
            .field("threads", &self.handles.len())
            .finish()
    }
}

impl WatcherWorker {
    pub(crate) fn new(handles: Vec<JoinHandle<()>>) -> Self {
        WatcherWorker { handles }
    }

    /// Block until every spawned thread has exited. Called by
    /// [`crate::session::SyncController::stop`] before it returns, which is
    /// what guarantees no event callback ever fires after `stop()` returns.
    pub fn join(self) {
        for handle in self.handles {
            if let Err(panic) = handle.join() {
                tracing::error!(?panic, "watcher thread panicked");
            }
        }
    }
}

/// Spawn the platform watcher for the current target.
pub fn spawn(
    initial: Vec<PortDescriptor>,
    stop: Arc<StopSignal>,
    event_cb: EventCb,
    error_cb: ErrorCb,
) -> Result<WatcherWorker, DiscoveryError> {
    #[cfg(target_os = "linux")]
    {
        linux::spawn(initial, stop, event_cb, error_cb)
    }
    #[cfg(target_os = "macos")]
    {
        macos::spawn(initial, stop, event_cb, error_cb)
    }
    #[cfg(windows)]
    {
        windows::spawn(initial, stop, event_cb, error_cb)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        let _ = (initial, stop, event_cb, error_cb);
        compile_error!("serial-discovery has no watcher implementation for this target");
    }
}
