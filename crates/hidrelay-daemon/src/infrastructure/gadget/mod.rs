//! The HID gadget sink: serialized, retrying writes to the three USB gadget
//! endpoints.
//!
//! Each endpoint is a mutex around its transport plus the pressed-state
//! report for that endpoint — the mutex is the per-endpoint single-writer
//! guarantee; multiple relays targeting the keyboard endpoint queue on it.
//!
//! A transient write failure (`EAGAIN`: the endpoint is momentarily busy,
//! typically around a cable event) is retried up to 3 times with a fixed
//! 100 ms backoff before being surfaced to the caller. A broken endpoint
//! (`EPIPE`/`ESHUTDOWN`: cable unplugged) surfaces immediately as
//! [`SinkError::Disconnected`]. Exactly one kernel write happens per
//! successfully applied report — a report that fails twice and then lands is
//! a single success with no duplicate.

#[cfg(target_os = "linux")]
pub mod hidg;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use hidrelay_core::event::{MouseAxis, TranslatedReport};
use hidrelay_core::report::{ConsumerReport, Endpoint, KeyboardReport, MouseReport};

use crate::application::sink::{HidSink, SinkError};

/// Total write attempts per report (1 initial + 2 retries).
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Fixed backoff between attempts.
pub const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Raw byte access to one gadget endpoint.
///
/// The production implementation ([`hidg::HidgTransport`]) writes to
/// `/dev/hidgN` opened non-blocking; tests script success and failure.
#[cfg_attr(test, mockall::automock)]
pub trait ReportTransport: Send {
    /// Writes one report. `WouldBlock` marks a transient failure the sink
    /// may retry; every other error is surfaced as-is.
    fn write_report(&mut self, report: &[u8]) -> io::Result<()>;
}

/// One endpoint: its transport and the state needed for release reports.
struct Slot<S> {
    transport: Box<dyn ReportTransport>,
    state: S,
}

/// The production [`HidSink`]: three serialized endpoints with retry.
pub struct GadgetSink {
    keyboard: Mutex<Slot<KeyboardReport>>,
    mouse: Mutex<Slot<MouseReport>>,
    consumer: Mutex<Slot<ConsumerReport>>,
}

impl GadgetSink {
    pub fn new(
        keyboard: Box<dyn ReportTransport>,
        mouse: Box<dyn ReportTransport>,
        consumer: Box<dyn ReportTransport>,
    ) -> Self {
        Self {
            keyboard: Mutex::new(Slot {
                transport: keyboard,
                state: KeyboardReport::new(),
            }),
            mouse: Mutex::new(Slot {
                transport: mouse,
                state: MouseReport::new(),
            }),
            consumer: Mutex::new(Slot {
                transport: consumer,
                state: ConsumerReport::new(),
            }),
        }
    }

    /// The retry loop shared by every endpoint write.
    async fn write_with_retry(
        transport: &mut dyn ReportTransport,
        endpoint: Endpoint,
        report: &[u8],
    ) -> Result<(), SinkError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match transport.write_report(report) {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(%endpoint, attempt, "write landed after retry");
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if attempt >= MAX_WRITE_ATTEMPTS {
                        return Err(SinkError::Busy {
                            endpoint,
                            attempts: attempt,
                        });
                    }
                    debug!(%endpoint, attempt, "write blocked; retrying");
                    tokio::time::sleep(WRITE_RETRY_DELAY).await;
                }
                Err(e) if is_disconnect_error(&e) => {
                    return Err(SinkError::Disconnected {
                        endpoint,
                        source: e,
                    });
                }
                Err(e) => {
                    return Err(SinkError::Io {
                        endpoint,
                        source: e,
                    });
                }
            }
        }
    }
}

/// `true` for errors that mean the endpoint itself is gone rather than busy.
fn is_disconnect_error(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::BrokenPipe {
        return true;
    }
    matches!(
        e.raw_os_error(),
        Some(108) /* ESHUTDOWN */ | Some(19) /* ENODEV */ | Some(6) /* ENXIO */
    )
}

#[async_trait]
impl HidSink for GadgetSink {
    async fn apply(&self, report: TranslatedReport) -> Result<(), SinkError> {
        match report {
            TranslatedReport::Key { usage, pressed } => {
                let mut slot = self.keyboard.lock().await;
                if pressed {
                    if !slot.state.press(usage) {
                        warn!(usage, "keyboard report full; key press dropped");
                        return Ok(());
                    }
                } else {
                    slot.state.release(usage);
                }
                let bytes = slot.state.to_bytes();
                Self::write_with_retry(slot.transport.as_mut(), Endpoint::Keyboard, &bytes).await
            }
            TranslatedReport::Button { mask, pressed } => {
                let mut slot = self.mouse.lock().await;
                if pressed {
                    slot.state.press(mask);
                } else {
                    slot.state.release(mask);
                }
                let bytes = slot.state.button_bytes();
                Self::write_with_retry(slot.transport.as_mut(), Endpoint::Mouse, &bytes).await
            }
            TranslatedReport::Motion { axis, delta } => {
                let (dx, dy, wheel) = match axis {
                    MouseAxis::X => (delta, 0, 0),
                    MouseAxis::Y => (0, delta, 0),
                    MouseAxis::Wheel => (0, 0, delta),
                };
                self.mouse_move(dx, dy, wheel).await
            }
            TranslatedReport::Consumer { usage, pressed } => {
                let mut slot = self.consumer.lock().await;
                if pressed {
                    slot.state.press(usage);
                } else {
                    slot.state.release(usage);
                }
                let bytes = slot.state.to_bytes();
                Self::write_with_retry(slot.transport.as_mut(), Endpoint::Consumer, &bytes).await
            }
        }
    }

    async fn mouse_move(&self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError> {
        let mut slot = self.mouse.lock().await;
        let bytes = slot.state.to_bytes(dx, dy, wheel);
        Self::write_with_retry(slot.transport.as_mut(), Endpoint::Mouse, &bytes).await
    }

    async fn release_all(&self) -> Result<(), SinkError> {
        // Attempt every endpoint even if an earlier one fails; report the
        // first failure afterwards.
        let mut first_error = None;

        if let Err(e) = self.release_keyboard().await {
            first_error.get_or_insert(e);
        }

        {
            let mut slot = self.mouse.lock().await;
            if !slot.state.is_empty() {
                slot.state.clear();
                let bytes = slot.state.button_bytes();
                if let Err(e) =
                    Self::write_with_retry(slot.transport.as_mut(), Endpoint::Mouse, &bytes).await
                {
                    first_error.get_or_insert(e);
                }
            }
        }

        {
            let mut slot = self.consumer.lock().await;
            if !slot.state.is_empty() {
                slot.state.clear();
                let bytes = slot.state.to_bytes();
                if let Err(e) =
                    Self::write_with_retry(slot.transport.as_mut(), Endpoint::Consumer, &bytes)
                        .await
                {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn release_keyboard(&self) -> Result<(), SinkError> {
        let mut slot = self.keyboard.lock().await;
        if slot.state.is_empty() {
            return Ok(());
        }
        slot.state.clear();
        let bytes = slot.state.to_bytes();
        Self::write_with_retry(slot.transport.as_mut(), Endpoint::Keyboard, &bytes).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
