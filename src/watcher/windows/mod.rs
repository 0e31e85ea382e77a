//! The Windows watcher: a message-only window on a dedicated pinned thread
//! feeds a single-slot coalescing channel that a second "reconciler" thread
//! drains.

mod guid;
mod wide;
mod wm;

use super::{ErrorCb, EventCb, StopSignal, WatcherWorker};
use crate::enumerator;
use crate::error::DiscoveryError;
use crate::port::PortDescriptor;
use crate::session::reconcile;
use std::ffi::OsString;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;
use wide::to_wide;
use windows_sys::Win32::UI::WindowsAndMessaging::{FindWindowW, PostMessageW, WM_CLOSE};

pub fn spawn(
    initial: Vec<PortDescriptor>,
    stop: Arc<StopSignal>,
    event_cb: EventCb,
    error_cb: ErrorCb,
) -> Result<WatcherWorker, DiscoveryError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let window_name = OsString::from(format!("arduino-serialdiscovery-{nanos}"));
    let pump_name = window_name.clone();

    let (tx, rx) = sync_channel::<()>(1);
    // `*mut SyncSender<()>` is not `Send`; the pump thread is the sole owner
    // of this pointer from here on, so ferry it across as a plain integer.
    let tx_ptr = Box::into_raw(Box::new(tx)) as usize;

    let wake_name = window_name.clone();
    stop.set_waker(Box::new(move || {
        let wide = to_wide(&wake_name);
        unsafe {
            let hwnd = FindWindowW(wm::WINDOW_CLASS_NAME, wide.as_ptr());
            if hwnd.is_null() {
                error!(error = ?std::io::Error::last_os_error(), "could not find window to stop");
                return;
            }
            if PostMessageW(hwnd, WM_CLOSE, 0, 0) == 0 {
                error!(error = ?std::io::Error::last_os_error(), "failed to post WM_CLOSE");
            }
        }
    }));

    let pump_error_cb = Arc::clone(&error_cb);
    let pump_handle = std::thread::spawn(move || {
        let result = unsafe { wm::window_dispatcher(pump_name, tx_ptr as *mut _) };
        if let Err(err) = result {
            pump_error_cb(err.to_string());
        }
    });

    // The initial snapshot's "add" events are emitted once by the session
    // controller before `spawn` is called; this watcher only reports
    // changes observed after that point.
    let reconciler_handle = std::thread::spawn(move || {
        let mut last_snapshot = initial;
        while rx.recv().is_ok() {
            match enumerator::enumerate() {
                Ok(current) => {
                    reconcile(&last_snapshot, &current, &event_cb);
                    last_snapshot = current;
                }
                Err(err) => error_cb(err.to_string()),
            }
        }
    });

    Ok(WatcherWorker::new(vec![pump_handle, reconciler_handle]))
}
