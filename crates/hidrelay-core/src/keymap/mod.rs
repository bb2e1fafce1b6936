//! Evdev-to-HID translation tables.
//!
//! The canonical output representation is a [`TranslatedReport`]: a HID usage
//! on the keyboard page (0x07), a mouse button bit, a relative motion axis,
//! or a usage on the consumer-control page (0x0C). Input codes are the
//! kernel's `input-event-codes.h` values, carried as plain `u16` so this
//! crate stays free of OS bindings.
//!
//! Each sub-module holds one table as a `static` slice of `(code, usage)`
//! pairs sorted by code and searched with `binary_search_by_key`. The tables
//! are deliberately data rather than `match` arms: property tests audit that
//! every entry is sorted, unique, and inside the valid HID range for its
//! category.
//!
//! Codes absent from every table translate to `None` ("skip"). An
//! unrecognized code must never abort the relay; the caller logs and moves on.

pub mod consumer;
pub mod keyboard;
pub mod mouse;

use crate::event::{KeyAction, MouseAxis, RawEvent, TranslatedReport};

/// Translates a raw input event into its HID report form.
///
/// Returns `None` when the event carries nothing forwardable: an unknown
/// code, a typematic key repeat, or a non-key non-relative event.
pub fn translate(event: &RawEvent) -> Option<TranslatedReport> {
    match *event {
        RawEvent::Key { code, action } => {
            let pressed = match action {
                KeyAction::Press => true,
                KeyAction::Release => false,
                KeyAction::Repeat => return None,
            };
            if let Some(mask) = mouse::button_mask(code) {
                return Some(TranslatedReport::Button { mask, pressed });
            }
            if let Some(usage) = consumer::usage_for(code) {
                return Some(TranslatedReport::Consumer { usage, pressed });
            }
            keyboard::usage_for(code).map(|usage| TranslatedReport::Key { usage, pressed })
        }
        RawEvent::Relative { code, value } => {
            let axis = mouse::motion_axis(code)?;
            let delta = value.clamp(-127, 127) as i8;
            Some(TranslatedReport::Motion { axis, delta })
        }
        RawEvent::Other { .. } => None,
    }
}

/// Looks up `code` in a sorted `(code, usage)` table.
pub(crate) fn lookup<U: Copy>(table: &[(u16, U)], code: u16) -> Option<U> {
    table
        .binary_search_by_key(&code, |&(c, _)| c)
        .ok()
        .map(|i| table[i].1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
