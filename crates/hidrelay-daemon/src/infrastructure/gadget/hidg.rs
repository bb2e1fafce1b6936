//! `/dev/hidgN` transport: non-blocking writes to a USB gadget character
//! device, with automatic handle recovery.
//!
//! The gadget device files come and go with the UDC state. Two failure modes
//! need distinct handling:
//!
//! - `EAGAIN`: the endpoint is momentarily busy — the handle stays open and
//!   the error is surfaced as `WouldBlock` for the sink's retry loop;
//! - `ESHUTDOWN`/`ENODEV`: the endpoint was torn down (cable pulled, gadget
//!   reconfigured) — the handle is closed here and transparently reopened on
//!   the next write attempt once the device file is back.
//!
//! The handle is opened lazily on first use, so the daemon can start before
//! the gadget is fully configured.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use tracing::{debug, info};

use super::ReportTransport;

/// Lazily-opened non-blocking gadget endpoint file.
pub struct HidgTransport {
    path: PathBuf,
    file: Option<File>,
}

impl HidgTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// The device node this transport writes to.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn ensure_open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&self.path)?;
            info!(endpoint = %self.path.display(), "opened gadget endpoint");
            self.file = Some(file);
        }
        // The branch above guarantees the handle exists.
        Ok(self.file.as_mut().expect("handle opened above"))
    }
}

impl ReportTransport for HidgTransport {
    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        let result = self.ensure_open()?.write_all(report);
        if let Err(e) = &result {
            if needs_reopen(e) {
                debug!(
                    endpoint = %self.path.display(),
                    error = %e,
                    "closing gadget handle for recovery"
                );
                self.file = None;
            }
        }
        result
    }
}

/// Errors after which the stale handle must be dropped so the next write can
/// reopen the device file.
fn needs_reopen(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(108) /* ESHUTDOWN */ | Some(19) /* ENODEV */ | Some(6) /* ENXIO */
    ) || e.kind() == io::ErrorKind::BrokenPipe
}

// ── Tests ─────────────────────────────────────────────────────────────────────
