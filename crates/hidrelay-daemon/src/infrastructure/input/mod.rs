//! Input-device infrastructure: enumeration and event streams over evdev.
//!
//! Implements the application layer's [`DeviceProvider`] and [`InputSource`]
//! seams against `/dev/input/event*` character devices. Everything evdev
//! lives behind these traits so the relay lifecycle stays testable off-target.

#[cfg(target_os = "linux")]
pub mod evdev_source;

#[cfg(target_os = "linux")]
pub use evdev_source::EvdevProvider;
