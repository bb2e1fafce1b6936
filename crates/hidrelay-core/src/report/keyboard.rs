//! USB HID keyboard report (boot protocol compatible).
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```
//!
//! Modifier usages (0xE0–0xE7) fold into byte 0; all other usages occupy one
//! of the six slots. A seventh concurrent key does not fit the boot layout
//! and is rejected (the caller logs and drops it — no phantom rollover state
//! is emitted).

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// First usage of the modifier block.
const MODIFIER_BASE: u8 = 0xE0;

/// Boot-protocol keyboard report tracking currently pressed keys.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    modifier: u8,
    /// Up to 6 simultaneously pressed key usages; 0 = empty slot.
    keys: [u8; 6],
}

impl KeyboardReport {
    /// Creates an empty (all-keys-released) report.
    pub const fn new() -> Self {
        Self {
            modifier: 0,
            keys: [0; 6],
        }
    }

    /// Registers a key press. Returns `false` when the usage could not be
    /// added because all six slots are occupied; pressing an already-held
    /// usage is a no-op that returns `true`.
    pub fn press(&mut self, usage: u8) -> bool {
        if usage >= MODIFIER_BASE {
            self.modifier |= 1 << (usage - MODIFIER_BASE);
            return true;
        }
        if self.keys.contains(&usage) {
            return true;
        }
        if let Some(slot) = self.keys.iter_mut().find(|k| **k == 0) {
            *slot = usage;
            return true;
        }
        false
    }

    /// Registers a key release. Releasing a usage that is not held is a no-op.
    pub fn release(&mut self, usage: u8) {
        if usage >= MODIFIER_BASE {
            self.modifier &= !(1 << (usage - MODIFIER_BASE));
            return;
        }
        for slot in self.keys.iter_mut() {
            if *slot == usage {
                *slot = 0;
            }
        }
    }

    /// Releases everything at once.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Returns `true` if no keys and no modifiers are held.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keys.iter().all(|&k| k == 0)
    }

    /// Serializes into the 8-byte wire form.
    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        buf[0] = self.modifier;
        buf[2..8].copy_from_slice(&self.keys);
        buf
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_serializes_to_zeroes() {
        assert_eq!(KeyboardReport::new().to_bytes(), [0u8; 8]);
    }

    #[test]
    fn test_press_places_usage_in_first_free_slot() {
        let mut report = KeyboardReport::new();
        assert!(report.press(0x04)); // A
        assert!(report.press(0x05)); // B
        let bytes = report.to_bytes();
        assert_eq!(bytes[2], 0x04);
        assert_eq!(bytes[3], 0x05);
        assert_eq!(bytes[0], 0, "no modifier set");
    }

    #[test]
    fn test_modifier_press_sets_bitfield_not_a_slot() {
        let mut report = KeyboardReport::new();
        assert!(report.press(0xE0)); // left ctrl
        assert!(report.press(0xE5)); // right shift
        let bytes = report.to_bytes();
        assert_eq!(bytes[0], 0b0010_0001);
        assert!(bytes[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_release_clears_only_the_matching_slot() {
        let mut report = KeyboardReport::new();
        report.press(0x04);
        report.press(0x05);
        report.release(0x04);
        let bytes = report.to_bytes();
        assert_eq!(bytes[2], 0);
        assert_eq!(bytes[3], 0x05);
    }

    #[test]
    fn test_release_of_unheld_usage_is_a_noop() {
        let mut report = KeyboardReport::new();
        report.press(0x04);
        report.release(0x3A); // F1 was never pressed
        assert_eq!(report.to_bytes()[2], 0x04);
    }

    #[test]
    fn test_double_press_does_not_occupy_two_slots() {
        let mut report = KeyboardReport::new();
        assert!(report.press(0x04));
        assert!(report.press(0x04));
        let held = report.to_bytes()[2..].iter().filter(|&&b| b == 0x04).count();
        assert_eq!(held, 1);
    }

    #[test]
    fn test_seventh_key_is_rejected() {
        let mut report = KeyboardReport::new();
        for usage in 0x04..0x0A {
            assert!(report.press(usage));
        }
        assert!(!report.press(0x0A), "seventh key must not fit");
        // The report still carries the original six.
        assert_eq!(&report.to_bytes()[2..], &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn test_modifiers_still_work_when_slots_are_full() {
        let mut report = KeyboardReport::new();
        for usage in 0x04..0x0A {
            report.press(usage);
        }
        assert!(report.press(0xE1), "modifiers bypass the six slots");
        assert_eq!(report.to_bytes()[0], 0b0000_0010);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut report = KeyboardReport::new();
        report.press(0xE0);
        report.press(0x04);
        assert!(!report.is_empty());
        report.clear();
        assert!(report.is_empty());
        assert_eq!(report.to_bytes(), [0u8; 8]);
    }
}
