//! Device identifiers: matching physical input devices against the
//! operator's allow-list.
//!
//! An identifier is parsed from a string into one of three forms:
//!
//! - a device node path (`/dev/input/event5`), matched exactly;
//! - a MAC-style hardware address (`AA:BB:CC:DD:EE:FF`, `-` separators
//!   accepted), matched case-insensitively against the device's unique
//!   identifier as reported by the kernel;
//! - anything else: a case-insensitive substring of the device name.
//!
//! Identifiers are immutable once parsed.

use std::fmt;

/// How a [`DeviceIdentifier`] matches devices.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentifierKind {
    /// Exact `/dev/input/event*` path.
    Path,
    /// Hardware address, normalized to lowercase colon-separated form.
    Mac,
    /// Lowercased substring of the device name.
    NameFragment,
}

/// A single allow-list entry identifying an input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentifier {
    raw: String,
    kind: IdentifierKind,
    normalized: String,
}

impl DeviceIdentifier {
    /// Parses an identifier string, classifying it as path, MAC, or name
    /// fragment. Never fails: a string that is neither a path nor a MAC is a
    /// name fragment.
    pub fn parse(value: &str) -> Self {
        let kind = if value.starts_with("/dev/input/event") {
            IdentifierKind::Path
        } else if is_mac(value) {
            IdentifierKind::Mac
        } else {
            IdentifierKind::NameFragment
        };
        let normalized = match kind {
            IdentifierKind::Path => value.to_string(),
            IdentifierKind::Mac => value.to_lowercase().replace('-', ":"),
            IdentifierKind::NameFragment => value.to_lowercase(),
        };
        Self {
            raw: value.to_string(),
            kind,
            normalized,
        }
    }

    /// Checks whether this identifier matches a device described by its node
    /// path, name, and unique hardware identifier (the `uniq` attribute,
    /// which for Bluetooth devices is the peer MAC address).
    pub fn matches(&self, path: &str, name: &str, uniq: Option<&str>) -> bool {
        match self.kind {
            IdentifierKind::Path => self.normalized == path,
            IdentifierKind::Mac => uniq
                .map(|u| u.to_lowercase().replace('-', ":") == self.normalized)
                .unwrap_or(false),
            IdentifierKind::NameFragment => name.to_lowercase().contains(&self.normalized),
        }
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IdentifierKind::Path => "path",
            IdentifierKind::Mac => "mac",
            IdentifierKind::NameFragment => "name",
        };
        write!(f, "{kind} \"{}\"", self.raw)
    }
}

/// Six hex pairs separated by `:` or `-`.
fn is_mac(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    for (i, &b) in bytes.iter().enumerate() {
        if i % 3 == 2 {
            if b != b':' && b != b'-' {
                return false;
            }
        } else if !b.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────
