//! # hidrelay-core
//!
//! Shared library for hidrelay containing the input-event model, the
//! evdev-to-HID translation tables, boot-protocol report packing, device
//! identifier matching, shortcut gesture recognizers, and the synthetic
//! mouse movement pattern engine.
//!
//! This crate is used by the relay daemon and its tests. It has zero
//! dependencies on OS APIs: no device files, no udev, no async runtime.
//! Everything here is deterministic and unit-testable on any platform.
//!
//! # Module map
//!
//! - **`event`** – The generic input-event model ([`RawEvent`]) produced by
//!   the OS layer and the translated HID-side representation
//!   ([`TranslatedReport`]).
//!
//! - **`keymap`** – Pure lookup tables mapping evdev key/button/axis codes to
//!   HID usages. The tables are static data audited by property tests, not
//!   branching logic.
//!
//! - **`report`** – Byte-exact boot-protocol HID reports (keyboard 8 bytes,
//!   mouse 4 bytes, consumer control 2 bytes) with the pressed-state
//!   bookkeeping needed to emit compensating releases.
//!
//! - **`identifier`** – Matching of physical devices against the operator's
//!   allow-list by path, MAC-style address, or name fragment.
//!
//! - **`shortcut`** – The timed Control-tap gesture and the configurable
//!   pause chord recognizer.
//!
//! - **`pattern`** – The lazy, restartable generator of relative mouse
//!   displacement sequences (circle / zigzag / square / mix / random).

pub mod event;
pub mod identifier;
pub mod keymap;
pub mod pattern;
pub mod report;
pub mod shortcut;

// Re-export the most-used types at the crate root so callers can write
// `hidrelay_core::RawEvent` instead of `hidrelay_core::event::RawEvent`.
pub use event::{KeyAction, MouseAxis, RawEvent, TranslatedReport};
pub use identifier::DeviceIdentifier;
pub use keymap::translate;
pub use pattern::{MovementConfig, PatternCursor, PatternName, Step};
pub use report::{ConsumerReport, KeyboardReport, MouseReport};
pub use shortcut::{ChordDetector, TapSequenceDetector};
