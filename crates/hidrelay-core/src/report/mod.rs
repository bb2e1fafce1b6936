//! Boot-protocol HID output reports with pressed-state bookkeeping.
//!
//! Each gadget endpoint has a fixed report layout:
//!
//! ```text
//! keyboard  8 bytes: modifier bitfield, reserved, 6 key usage slots
//! mouse     4 bytes: button bits, dx, dy, wheel (signed, -127..127)
//! consumer  2 bytes: little-endian usage ID, 0x0000 = released
//! ```
//!
//! The structs here track what is currently held down so that the daemon can
//! emit correct release reports — including the compensating "release all"
//! written when a relay is torn down while keys are still pressed.

pub mod consumer;
pub mod keyboard;
pub mod mouse;

pub use consumer::{ConsumerReport, CONSUMER_REPORT_SIZE};
pub use keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};
pub use mouse::{MouseReport, MOUSE_REPORT_SIZE};

/// The three gadget endpoints a translated report can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Keyboard,
    Mouse,
    Consumer,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Endpoint::Keyboard => "keyboard",
            Endpoint::Mouse => "mouse",
            Endpoint::Consumer => "consumer",
        })
    }
}
