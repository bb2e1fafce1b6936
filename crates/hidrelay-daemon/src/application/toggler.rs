//! The shared pause/resume shortcut handler.
//!
//! One `ShortcutToggler` is shared by every device relay: each relay feeds
//! its key events in, and when the configured chord fires the toggler flips
//! the manual pause cause for the whole process.
//!
//! Toggling into the paused state releases everything held on the keyboard
//! and mouse endpoints (keys pressed before the pause must not stay stuck on
//! the downstream host) and resets the chord state so keys released while
//! paused cannot linger in the pressed set.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use hidrelay_core::event::KeyAction;
use hidrelay_core::shortcut::ChordDetector;

use super::pause::PauseSignal;
use super::sink::HidSink;

/// Shared chord watcher that toggles relaying on and off.
pub struct ShortcutToggler {
    chord: Mutex<ChordDetector>,
    pause: PauseSignal,
    sink: Arc<dyn HidSink>,
}

impl ShortcutToggler {
    pub fn new(chord: ChordDetector, pause: PauseSignal, sink: Arc<dyn HidSink>) -> Self {
        Self {
            chord: Mutex::new(chord),
            pause,
            sink,
        }
    }

    /// Feeds one key event from any relay. Flips the manual pause cause when
    /// the chord completes.
    pub async fn handle_key(&self, code: u16, action: KeyAction) {
        let fired = self.chord.lock().await.observe(code, action);
        if fired {
            self.toggle().await;
        }
    }

    async fn toggle(&self) {
        let paused = self.pause.toggle_manual();
        if paused {
            if let Err(e) = self.sink.release_all().await {
                warn!(error = %e, "failed to release held keys while pausing");
            }
            self.chord.lock().await.reset();
            info!("relaying paused by shortcut");
        } else {
            info!("relaying resumed by shortcut");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
