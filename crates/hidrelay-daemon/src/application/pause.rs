//! The process-wide pause signal.
//!
//! Relaying can be paused by two independent causes:
//!
//! - **manual** – the operator's pause/resume shortcut;
//! - **link** – the USB cable is disconnected (UDC not configured).
//!
//! The causes are tracked separately and ORed into the effective state, so a
//! cable reconnect cannot override a manual pause and vice versa. No winner
//! is assumed between near-simultaneous toggles; the two bits commute.
//!
//! Every device relay reads [`PauseSignal::is_paused`] once per event before
//! forwarding. Reads are relaxed atomics — the per-event check is the
//! atomicity boundary the spec requires, and relays blocked on device I/O
//! pick up changes at their next event without any polling. A
//! `tokio::sync::watch` channel additionally publishes effective-state
//! transitions for observers that want to react promptly (logging, tests).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared two-cause pause flag. Cheap to clone; all clones observe the same
/// state.
#[derive(Debug, Clone)]
pub struct PauseSignal {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    manual: AtomicBool,
    link: AtomicBool,
    effective_tx: watch::Sender<bool>,
}

impl PauseSignal {
    /// Creates an unpaused signal.
    pub fn new() -> Self {
        let (effective_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                manual: AtomicBool::new(false),
                link: AtomicBool::new(false),
                effective_tx,
            }),
        }
    }

    /// Effective state: paused if either cause is set.
    pub fn is_paused(&self) -> bool {
        self.inner.manual.load(Ordering::Relaxed) || self.inner.link.load(Ordering::Relaxed)
    }

    /// The manual (shortcut) cause alone.
    pub fn manual_cause(&self) -> bool {
        self.inner.manual.load(Ordering::Relaxed)
    }

    /// The link (cable) cause alone.
    pub fn link_cause(&self) -> bool {
        self.inner.link.load(Ordering::Relaxed)
    }

    /// Sets or clears the manual cause.
    pub fn set_manual(&self, paused: bool) {
        self.inner.manual.store(paused, Ordering::Relaxed);
        self.publish();
    }

    /// Flips the manual cause; returns its new value.
    pub fn toggle_manual(&self) -> bool {
        let now = !self.inner.manual.load(Ordering::Relaxed);
        self.inner.manual.store(now, Ordering::Relaxed);
        self.publish();
        now
    }

    /// Sets or clears the link cause.
    pub fn set_link(&self, paused: bool) {
        let previous = self.inner.link.swap(paused, Ordering::Relaxed);
        if previous != paused {
            if paused {
                info!("USB link down; relaying paused");
            } else {
                info!("USB link up; relaying may resume");
            }
        }
        self.publish();
    }

    /// Subscribes to effective-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.effective_tx.subscribe()
    }

    fn publish(&self) {
        // send_if_modified keeps the watch quiet when a cause flips but the
        // effective OR does not change.
        let effective = self.is_paused();
        self.inner.effective_tx.send_if_modified(|current| {
            if *current != effective {
                *current = effective;
                true
            } else {
                false
            }
        });
    }
}

impl Default for PauseSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
