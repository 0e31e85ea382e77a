//! serial-discovery is a pluggable-discovery agent for serial ports.
//!
//! It reports the set of serial ports currently attached to the host and, once
//! synchronization is started, streams `add`/`remove` events as ports come and
//! go. The agent is driven by a parent process over a line-oriented,
//! JSON-framed protocol on standard input/output (see [`protocol`]).
//!
//! The interesting part of this crate is the continuous synchronization
//! subsystem in [`watcher`] and [`session`]: three fundamentally different
//! OS-native notification mechanisms (Linux udev netlink, macOS kqueue,
//! Windows `WM_DEVICECHANGE`) are adapted to a single [`diff`]-driven
//! add/remove event stream.

#![deny(
    clippy::dbg_macro,
    missing_debug_implementations,
    missing_copy_implementations
)]

pub mod diff;
pub mod enumerator;
pub mod error;
pub mod filter;
pub mod port;
pub mod protocol;
pub mod session;
pub mod version;
pub mod watcher;

pub use error::DiscoveryError;
pub use port::PortDescriptor;
