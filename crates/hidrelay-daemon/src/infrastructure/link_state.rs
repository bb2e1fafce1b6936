//! UDC link-state monitor.
//!
//! The USB Device Controller exposes its connection state in sysfs
//! (`/sys/class/udc/<udc>/state`). `configured` means the downstream host
//! has enumerated the gadget and the HID endpoints are usable; anything else
//! means the cable is out or the host is gone.
//!
//! The monitor polls the state file and drives the **link** pause cause —
//! and only that cause, so a cable reconnect can never override a manual
//! pause. An unreadable state file is treated as `not_attached` (paused)
//! once monitoring has started; a host without any UDC at all is detected up
//! front and monitoring is skipped with a warning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::application::pause::PauseSignal;

/// Poll interval for the sysfs state file.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The UDC state that allows relaying.
const STATE_CONFIGURED: &str = "configured";

/// State assumed when the file cannot be read.
const STATE_NOT_ATTACHED: &str = "not_attached";

/// Resolves the state file for a named UDC.
pub fn udc_state_path(udc_name: &str) -> PathBuf {
    Path::new("/sys/class/udc").join(udc_name).join("state")
}

/// Picks the first UDC registered in sysfs, the way single-controller boards
/// have exactly one.
pub fn find_udc_state_path() -> Option<PathBuf> {
    let entries = std::fs::read_dir("/sys/class/udc").ok()?;
    for entry in entries.flatten() {
        return Some(entry.path().join("state"));
    }
    None
}

/// Polls one UDC state file and drives the link pause cause.
pub struct LinkStateMonitor {
    state_path: PathBuf,
    poll_interval: Duration,
    pause: PauseSignal,
}

impl LinkStateMonitor {
    pub fn new(state_path: PathBuf, pause: PauseSignal) -> Self {
        Self {
            state_path,
            poll_interval: POLL_INTERVAL,
            pause,
        }
    }

    /// Overrides the poll interval (tests).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs until the shutdown signal fires, applying state transitions to
    /// the pause signal as they are observed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(state_file = %self.state_path.display(), "link-state monitor running");
        let mut last: Option<String> = None;

        loop {
            let state = self.read_state().await;
            if last.as_deref() != Some(state.as_str()) {
                debug!(state = %state, "UDC state changed");
                self.pause.set_link(state != STATE_CONFIGURED);
                last = Some(state);
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!("link-state monitor stopped");
    }

    async fn read_state(&self) -> String {
        match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => content.trim().to_lowercase(),
            Err(_) => STATE_NOT_ATTACHED.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
