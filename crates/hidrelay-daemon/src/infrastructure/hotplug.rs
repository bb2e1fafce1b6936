//! udev-based hot-plug monitor for input devices.
//!
//! Subscribes to the kernel device-event bus (netlink, subsystem `input`)
//! and forwards add/remove notifications for `/dev/input/event*` nodes to
//! the relay controller over an async channel.
//!
//! The monitor socket is consumed on a dedicated thread: libudev's socket
//! I/O is synchronous, so the thread polls with a 500 ms timeout and checks
//! the shared running flag between polls, exiting cleanly on shutdown. The
//! controller tolerates duplicate notifications, so this layer does no
//! dedup.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::application::controller::DeviceEvent;

/// Poll timeout between running-flag checks.
const POLL_TIMEOUT_MS: u16 = 500;

/// Error type for hot-plug monitor startup.
#[derive(Debug, Error)]
pub enum HotplugError {
    /// The udev monitor socket could not be created or bound.
    #[error("failed to open udev monitor socket: {0}")]
    Socket(#[source] std::io::Error),
    /// The monitor thread could not be spawned.
    #[error("failed to spawn hotplug thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Opens the udev monitor and spawns the background thread feeding
/// [`DeviceEvent`]s to the returned receiver.
///
/// # Errors
///
/// Returns [`HotplugError::Socket`] if the netlink socket cannot be opened
/// (e.g. udev not available in a container).
pub fn start_hotplug_monitor(
    running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<DeviceEvent>, HotplugError> {
    let socket = udev::MonitorBuilder::new()
        .and_then(|builder| builder.match_subsystem("input"))
        .and_then(|builder| builder.listen())
        .map_err(HotplugError::Socket)?;

    let (tx, rx) = mpsc::channel(64);

    // `udev::MonitorSocket` wraps a `udev::MonitorBuilder`, which upstream
    // explicitly marks `Send`; the `Send` impl for the socket itself was
    // simply omitted. Moving the socket to the monitor thread is therefore
    // sound. Wrap it so the spawn type-checks, then unwrap on the thread.
    let socket = SendSocket(socket);

    std::thread::Builder::new()
        .name("hidrelay-hotplug".to_string())
        .spawn(move || {
            let socket = socket;
            monitor_loop(socket.0, tx, running)
        })
        .map_err(HotplugError::Thread)?;

    info!("hotplug monitor subscribed to udev input events");
    Ok(rx)
}

/// Transfer wrapper letting the monitor socket move to the worker thread.
///
/// Safe because `udev::MonitorSocket` wraps a `udev::MonitorBuilder`, which
/// upstream marks `Send`; see [`start_hotplug_monitor`].
struct SendSocket(udev::MonitorSocket);

// SAFETY: the wrapped socket only borrows the descriptor it owns and is used
// solely on the monitor thread after being moved there.
unsafe impl Send for SendSocket {}

/// The receive loop executed on the monitor thread.
fn monitor_loop(
    mut socket: udev::MonitorSocket,
    tx: mpsc::Sender<DeviceEvent>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        // SAFETY: the socket owns the descriptor and outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(POLL_TIMEOUT_MS)) {
            Ok(0) => continue, // timeout: re-check the running flag
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "hotplug poll failed");
                break;
            }
        }

        while let Some(event) = socket.iter().next() {
            if let Some(device_event) = classify(&event) {
                debug!(?device_event, "hotplug");
                if tx.blocking_send(device_event).is_err() {
                    // Receiver dropped - the controller is shutting down.
                    return;
                }
            }
        }
    }

    info!("hotplug monitor stopped");
}

/// Filters udev events down to add/remove of input event nodes.
fn classify(event: &udev::Event) -> Option<DeviceEvent> {
    let node = event.devnode()?.to_str()?;
    if !node.starts_with("/dev/input/event") {
        return None;
    }
    match event.event_type() {
        udev::EventType::Add => Some(DeviceEvent::Added {
            path: node.to_string(),
        }),
        udev::EventType::Remove => Some(DeviceEvent::Removed {
            path: node.to_string(),
        }),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
