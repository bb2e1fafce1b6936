//! evdev-backed device provider and event source.
//!
//! Reads use the evdev crate's tokio event stream, so a relay waiting for
//! input suspends without blocking anything else; cancellation drops the
//! stream, which closes the device file descriptor.

use std::io;

use async_trait::async_trait;
use evdev::{Device, EventStream, EventType};
use tracing::{debug, warn};

use hidrelay_core::event::{KeyAction, RawEvent};

use crate::application::controller::DeviceProvider;
use crate::application::device_relay::{DeviceInfo, InputSource};

/// Enumerates and opens `/dev/input/event*` devices.
pub struct EvdevProvider;

impl EvdevProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EvdevProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(path: &str, device: &Device) -> DeviceInfo {
    DeviceInfo {
        path: path.to_string(),
        name: device.name().unwrap_or("unknown").to_string(),
        uniq: device.unique_name().map(|u| u.to_string()),
    }
}

#[async_trait]
impl DeviceProvider for EvdevProvider {
    async fn list(&self) -> Vec<DeviceInfo> {
        // Enumeration opens every device node; keep it off the async threads.
        let result = tokio::task::spawn_blocking(|| {
            evdev::enumerate()
                .map(|(path, device)| describe(&path.to_string_lossy(), &device))
                .collect::<Vec<_>>()
        })
        .await;
        match result {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "device enumeration task failed");
                Vec::new()
            }
        }
    }

    async fn open(&self, path: &str) -> io::Result<(DeviceInfo, Box<dyn InputSource>)> {
        let device = Device::open(path)?;
        let info = describe(path, &device);
        let stream = device.into_event_stream()?;
        Ok((info, Box::new(EvdevSource { stream }) as Box<dyn InputSource>))
    }
}

/// Async event stream over one opened device.
pub struct EvdevSource {
    stream: EventStream,
}

#[async_trait]
impl InputSource for EvdevSource {
    async fn next_event(&mut self) -> io::Result<Option<RawEvent>> {
        match self.stream.next_event().await {
            Ok(event) => Ok(Some(convert(event))),
            // ENODEV: the device node went away — a clean end of stream.
            Err(e) if e.raw_os_error() == Some(19) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn grab(&mut self) -> io::Result<()> {
        self.stream.device_mut().grab()
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.stream.device_mut().ungrab()
    }
}

/// Maps a kernel `input_event` into the OS-independent model.
fn convert(event: evdev::InputEvent) -> RawEvent {
    match event.event_type() {
        EventType::KEY => match KeyAction::from_value(event.value()) {
            Some(action) => RawEvent::Key {
                code: event.code(),
                action,
            },
            None => {
                debug!(code = event.code(), value = event.value(), "odd key value");
                RawEvent::Other {
                    event_type: EventType::KEY.0,
                    code: event.code(),
                    value: event.value(),
                }
            }
        },
        EventType::RELATIVE => RawEvent::Relative {
            code: event.code(),
            value: event.value(),
        },
        other => RawEvent::Other {
            event_type: other.0,
            code: event.code(),
            value: event.value(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
