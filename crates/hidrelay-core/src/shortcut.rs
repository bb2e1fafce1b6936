//! Shortcut gesture recognizers.
//!
//! Two independent recognizers observe the key stream without consuming it:
//!
//! - [`TapSequenceDetector`] – the fixed toggle gesture: five Control
//!   key-downs (left or right) inside a rolling 3-second window. Each relay
//!   owns one; triggering flips that relay's auto-movement.
//!
//! - [`ChordDetector`] – the configurable pause/resume hotkey, e.g.
//!   `LCTRL+LSHIFT+F12`. One instance is shared across all relays; firing
//!   flips the manual pause cause.
//!
//! Both reset their match state on non-matching input so unrelated rapid
//! typing cannot creep toward a false trigger.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::event::KeyAction;

/// evdev code for the left Control key.
pub const KEY_LEFTCTRL: u16 = 29;
/// evdev code for the right Control key.
pub const KEY_RIGHTCTRL: u16 = 97;

/// Number of Control taps that trigger the toggle gesture.
pub const TAP_TRIGGER_COUNT: usize = 5;
/// Rolling window the taps must fall into (inclusive).
pub const TAP_WINDOW: Duration = Duration::from_secs(3);

/// Detects the repeated-Control-tap toggle gesture.
#[derive(Debug, Default)]
pub struct TapSequenceDetector {
    taps: VecDeque<Instant>,
}

impl TapSequenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one key event. Returns `true` exactly when the gesture
    /// completes; the internal counter is cleared on trigger.
    ///
    /// A key-down of any non-Control key resets the counter. Key releases
    /// never affect it (the Control releases between taps are part of the
    /// gesture itself).
    pub fn observe(&mut self, code: u16, action: KeyAction, now: Instant) -> bool {
        if action != KeyAction::Press {
            return false;
        }
        if code != KEY_LEFTCTRL && code != KEY_RIGHTCTRL {
            self.taps.clear();
            return false;
        }

        self.taps.push_back(now);
        while let Some(&oldest) = self.taps.front() {
            if now.duration_since(oldest) > TAP_WINDOW {
                self.taps.pop_front();
            } else {
                break;
            }
        }

        if self.taps.len() >= TAP_TRIGGER_COUNT {
            self.taps.clear();
            true
        } else {
            false
        }
    }
}

/// Error type for chord specification parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("empty chord specification")]
    Empty,
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
}

/// Detects a simultaneously-held key chord.
///
/// Each chord element is a set of acceptable evdev codes, so generic names
/// like `CTRL` match either physical Control key. The chord fires on the
/// key-down that completes it and re-arms only after at least one chord key
/// is released, so typematic repeat of a held chord cannot re-trigger it.
#[derive(Debug)]
pub struct ChordDetector {
    chord: Vec<Vec<u16>>,
    pressed: HashSet<u16>,
    armed: bool,
}

impl ChordDetector {
    /// Parses a `+`-separated chord specification such as `LCTRL+LSHIFT+F12`.
    /// Key names are case-insensitive.
    pub fn parse(spec: &str) -> Result<Self, ChordParseError> {
        let mut chord = Vec::new();
        for token in spec.split('+').map(str::trim).filter(|t| !t.is_empty()) {
            let codes = codes_for_name(&token.to_uppercase())
                .ok_or_else(|| ChordParseError::UnknownKey(token.to_string()))?;
            chord.push(codes);
        }
        if chord.is_empty() {
            return Err(ChordParseError::Empty);
        }
        Ok(Self {
            chord,
            pressed: HashSet::new(),
            armed: true,
        })
    }

    /// Feeds one key event. Returns `true` when the chord fires.
    pub fn observe(&mut self, code: u16, action: KeyAction) -> bool {
        match action {
            KeyAction::Press => {
                self.pressed.insert(code);
            }
            KeyAction::Release => {
                self.pressed.remove(&code);
            }
            KeyAction::Repeat => return false,
        }

        let satisfied = self
            .chord
            .iter()
            .all(|alternatives| alternatives.iter().any(|c| self.pressed.contains(c)));

        if satisfied {
            if self.armed && action == KeyAction::Press {
                self.armed = false;
                return true;
            }
        } else {
            self.armed = true;
        }
        false
    }

    /// Forgets all held keys and re-arms. Used when relaying toggles off so a
    /// stale pressed set cannot linger across a pause.
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.armed = true;
    }
}

/// Resolves a chord token to the evdev codes it accepts.
fn codes_for_name(name: &str) -> Option<Vec<u16>> {
    let codes: Vec<u16> = match name {
        "CTRL" | "CONTROL" => vec![KEY_LEFTCTRL, KEY_RIGHTCTRL],
        "LCTRL" | "LEFTCTRL" => vec![KEY_LEFTCTRL],
        "RCTRL" | "RIGHTCTRL" => vec![KEY_RIGHTCTRL],
        "SHIFT" => vec![42, 54],
        "LSHIFT" | "LEFTSHIFT" => vec![42],
        "RSHIFT" | "RIGHTSHIFT" => vec![54],
        "ALT" => vec![56, 100],
        "LALT" | "LEFTALT" => vec![56],
        "RALT" | "RIGHTALT" | "ALTGR" => vec![100],
        "META" | "SUPER" | "GUI" | "WIN" => vec![125, 126],
        "LMETA" | "LEFTMETA" => vec![125],
        "RMETA" | "RIGHTMETA" => vec![126],
        "ESC" | "ESCAPE" => vec![1],
        "TAB" => vec![15],
        "ENTER" => vec![28],
        "SPACE" => vec![57],
        "BACKSPACE" => vec![14],
        "INSERT" => vec![110],
        "DELETE" => vec![111],
        "HOME" => vec![102],
        "END" => vec![107],
        "PAGEUP" => vec![104],
        "PAGEDOWN" => vec![109],
        "PAUSE" => vec![119],
        "SCROLLLOCK" => vec![70],
        "PRINTSCREEN" | "SYSRQ" => vec![99],
        _ => {
            if let Some(n) = name.strip_prefix('F').and_then(|s| s.parse::<u8>().ok()) {
                match n {
                    1..=10 => vec![58 + n as u16],
                    11 => vec![87],
                    12 => vec![88],
                    _ => return None,
                }
            } else if name.len() == 1 {
                let ch = name.as_bytes()[0];
                match ch {
                    b'A'..=b'Z' => {
                        // Letters are scattered across the evdev code space.
                        const LETTERS: [u16; 26] = [
                            30, 48, 46, 32, 18, 33, 34, 35, 23, 36, 37, 38, 50, 49, 24, 25, 16,
                            19, 31, 20, 22, 47, 17, 45, 21, 44,
                        ];
                        vec![LETTERS[(ch - b'A') as usize]]
                    }
                    b'1'..=b'9' => vec![(ch - b'1') as u16 + 2],
                    b'0' => vec![11],
                    _ => return None,
                }
            } else {
                return None;
            }
        }
    };
    Some(codes)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
