//! The generic input-event model shared between the OS layer and the relay.
//!
//! The daemon's evdev source converts kernel `input_event` structs into
//! [`RawEvent`] at the capture boundary; everything downstream of that point
//! (translation, shortcut detection, forwarding) is OS-independent and works
//! on these types alone.

/// What a key event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Key went down (evdev value 1).
    Press,
    /// Key came up (evdev value 0).
    Release,
    /// Typematic auto-repeat while held (evdev value 2). Repeats are not
    /// state changes; the translator skips them and the USB host synthesizes
    /// its own repeat.
    Repeat,
}

impl KeyAction {
    /// Maps an evdev key event value to the action it encodes.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyAction::Release),
            1 => Some(KeyAction::Press),
            2 => Some(KeyAction::Repeat),
            _ => None,
        }
    }
}

/// A raw input event read from a device, consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// A key or button changed state (evdev `EV_KEY`).
    Key { code: u16, action: KeyAction },
    /// Relative motion on one axis (evdev `EV_REL`).
    Relative { code: u16, value: i32 },
    /// Anything else (`EV_SYN`, `EV_MSC`, LED echoes, …). Carried so callers
    /// can log it; never forwarded.
    Other { event_type: u16, code: u16, value: i32 },
}

/// Relative mouse axis a motion event applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAxis {
    X,
    Y,
    Wheel,
}

/// The HID-side representation of a translated event, categorized by the
/// gadget endpoint it must be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatedReport {
    /// A keyboard usage (page 0x07) going down or up.
    Key { usage: u8, pressed: bool },
    /// A mouse button bit going down or up.
    Button { mask: u8, pressed: bool },
    /// Relative mouse motion on one axis, clamped to the report range.
    Motion { axis: MouseAxis, delta: i8 },
    /// A consumer-control usage (page 0x0C) going down or up.
    Consumer { usage: u16, pressed: bool },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
