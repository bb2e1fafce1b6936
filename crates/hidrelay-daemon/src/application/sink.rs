//! The sink trait every device relay writes HID reports through.
//!
//! The production implementation ([`crate::infrastructure::gadget::GadgetSink`])
//! serializes writers per endpoint and retries transient failures against the
//! USB gadget character devices; test implementations record calls.

use async_trait::async_trait;
use thiserror::Error;

use hidrelay_core::event::TranslatedReport;
use hidrelay_core::report::Endpoint;

/// Error type for gadget sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The endpoint stayed busy through every retry attempt.
    #[error("{endpoint} endpoint busy after {attempts} write attempts")]
    Busy { endpoint: Endpoint, attempts: u32 },

    /// The endpoint went away mid-write — the cable was unplugged or the
    /// gadget was torn down.
    #[error("{endpoint} endpoint disconnected: {source}")]
    Disconnected {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure.
    #[error("{endpoint} endpoint I/O error: {source}")]
    Io {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    /// `true` when the failure means the USB link itself is gone, so the
    /// caller should flip the link pause cause rather than keep writing.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, SinkError::Disconnected { .. })
    }

    /// The endpoint the failed write targeted.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            SinkError::Busy { endpoint, .. }
            | SinkError::Disconnected { endpoint, .. }
            | SinkError::Io { endpoint, .. } => *endpoint,
        }
    }
}

/// Write access to the three gadget endpoints.
///
/// Implementations must serialize concurrent writers per endpoint and keep
/// the pressed-key/button state needed by [`HidSink::release_all`].
#[async_trait]
pub trait HidSink: Send + Sync {
    /// Applies a translated report to the endpoint its category selects.
    async fn apply(&self, report: TranslatedReport) -> Result<(), SinkError>;

    /// Writes a relative mouse motion report (used by the movement engine).
    async fn mouse_move(&self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError>;

    /// Emits compensating release reports for everything currently held, on
    /// every endpoint that holds state. Quiet endpoints are left untouched.
    async fn release_all(&self) -> Result<(), SinkError>;

    /// Releases held keyboard keys only. Used before synthetic movement
    /// starts so the Control taps that triggered it cannot stay stuck down.
    async fn release_keyboard(&self) -> Result<(), SinkError>;
}
