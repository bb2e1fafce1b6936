//! Infrastructure layer for the relay daemon.
//!
//! Contains the OS-facing adapters: the USB gadget endpoint sink, evdev
//! input sources, the udev hot-plug monitor, the UDC link-state monitor, and
//! the pattern-configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hidrelay_core`, but MUST NOT be imported by the `application` layer.

pub mod gadget;
#[cfg(target_os = "linux")]
pub mod hotplug;
pub mod input;
#[cfg(target_os = "linux")]
pub mod link_state;
pub mod storage;
