//! Application layer of the relay daemon.
//!
//! Everything here depends only on `hidrelay-core` and on traits; the OS
//! adapters in `infrastructure/` are injected at construction time, which is
//! what makes the relay lifecycle fully testable with scripted devices and
//! recording sinks.
//!
//! # Sub-modules
//!
//! - **`pause`** – The process-wide pause signal with its two independent
//!   causes (manual shortcut, USB cable state) ORed into one effective flag.
//!
//! - **`sink`** – The [`sink::HidSink`] trait every relay writes through,
//!   and the sink error taxonomy.
//!
//! - **`toggler`** – The shared pause/resume chord handler. It watches every
//!   relay's key stream and flips the manual pause cause.
//!
//! - **`device_relay`** – The per-device relay task: read, detect gestures,
//!   gate on pause, translate, forward. Also drives the synthetic movement
//!   loop while the toggle gesture has it enabled.
//!
//! - **`controller`** – The top-level orchestrator owning one relay task per
//!   connected matching device, reacting to hot-plug events, and running the
//!   coordinated shutdown.

pub mod controller;
pub mod device_relay;
pub mod pause;
pub mod sink;
pub mod toggler;
