//! The relay controller: one task per connected matching device.
//!
//! The controller owns the set of active relays keyed by device node path,
//! reacts to hot-plug notifications, and guarantees the coordinated
//! shutdown: cancel every relay, await them within a bounded timeout, exit.
//!
//! Invariants it maintains:
//!
//! - at most one relay per device path (duplicate add notifications are
//!   ignored);
//! - a removed device's relay reaches `Stopped` — compensating releases
//!   written, handle closed — before its record is dropped;
//! - no relay outlives the controller's shutdown sequence;
//! - a relay failing on its own never affects its siblings. Termination is
//!   reported back over a channel and only removes that relay's record.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hidrelay_core::identifier::DeviceIdentifier;
use hidrelay_core::pattern::MovementConfig;

use super::device_relay::{DeviceInfo, DeviceRelay, InputSource, RelayOptions};
use super::pause::PauseSignal;
use super::sink::HidSink;
use super::toggler::ShortcutToggler;

/// How long a cancelled relay gets to finish its release path before it is
/// aborted outright.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on the whole shutdown sequence.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A hot-plug notification from the device-event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added { path: String },
    Removed { path: String },
}

/// Access to input devices, injected so tests can script devices.
///
/// The production implementation enumerates and opens evdev character
/// devices.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Lists the input devices currently present.
    async fn list(&self) -> Vec<DeviceInfo>;

    /// Opens a device for reading.
    async fn open(&self, path: &str) -> io::Result<(DeviceInfo, Box<dyn InputSource>)>;
}

/// Operator-facing matching and relay options.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Allow-list of device identifiers. Ignored when `auto_discover` is on.
    pub identifiers: Vec<DeviceIdentifier>,
    /// Relay every device whose name does not match a skip prefix.
    pub auto_discover: bool,
    /// Device-name prefixes excluded from auto-discovery.
    pub skip_name_prefixes: Vec<String>,
    /// Grab devices exclusively while relaying.
    pub grab_devices: bool,
    /// Movement pattern configuration handed to every relay.
    pub movement: MovementConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            identifiers: Vec::new(),
            auto_discover: false,
            skip_name_prefixes: vec!["vc4-hdmi".to_string()],
            grab_devices: false,
            movement: MovementConfig::default(),
        }
    }
}

/// Runtime record for one active relay.
struct RelayTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The top-level orchestrator.
pub struct RelayController {
    provider: Arc<dyn DeviceProvider>,
    sink: Arc<dyn HidSink>,
    pause: PauseSignal,
    toggler: Option<Arc<ShortcutToggler>>,
    config: ControllerConfig,
    tasks: HashMap<String, RelayTask>,
    stopped_tx: mpsc::Sender<String>,
    /// Taken by [`RelayController::run`]; kept here so relays spawned through
    /// the public `add_device` before `run` starts still report termination.
    stopped_rx: Option<mpsc::Receiver<String>>,
}

impl RelayController {
    pub fn new(
        provider: Arc<dyn DeviceProvider>,
        sink: Arc<dyn HidSink>,
        pause: PauseSignal,
        toggler: Option<Arc<ShortcutToggler>>,
        config: ControllerConfig,
    ) -> Self {
        let (stopped_tx, stopped_rx) = mpsc::channel(64);
        Self {
            provider,
            sink,
            pause,
            toggler,
            config,
            tasks: HashMap::new(),
            stopped_tx,
            stopped_rx: Some(stopped_rx),
        }
    }

    /// Number of currently active relays.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether a relay exists for the given device path.
    pub fn is_active(&self, path: &str) -> bool {
        self.tasks.contains_key(path)
    }

    /// Runs until the shutdown signal fires: initial device scan, then the
    /// hot-plug event loop, then coordinated teardown.
    pub async fn run(
        mut self,
        mut devices: mpsc::Receiver<DeviceEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut stopped_rx = match self.stopped_rx.take() {
            Some(rx) => rx,
            None => {
                warn!("relay controller run() called twice");
                return;
            }
        };

        for info in self.provider.list().await {
            if self.should_relay(&info) {
                self.add_device(&info.path).await;
            }
        }
        info!(active = self.active_count(), "relay controller running");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                event = devices.recv() => match event {
                    Some(DeviceEvent::Added { path }) => self.add_device(&path).await,
                    Some(DeviceEvent::Removed { path }) => self.remove_device(&path).await,
                    None => break,
                },
                Some(path) = stopped_rx.recv() => {
                    // The relay terminated on its own (device gone, fatal
                    // error). Its release path already ran.
                    if self.tasks.remove(&path).is_some() {
                        debug!(device = %path, "reaped self-stopped relay");
                    }
                }
            }
        }

        self.shutdown_all().await;
    }

    /// Starts a relay for `path` unless one is already running or the device
    /// does not match. Tolerates devices that vanish before they are opened.
    pub async fn add_device(&mut self, path: &str) {
        if self.tasks.contains_key(path) {
            debug!(device = %path, "already relaying; duplicate add ignored");
            return;
        }

        let (info, source) = match self.provider.open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                debug!(device = %path, error = %e, "device vanished before opening");
                return;
            }
        };
        if !self.should_relay(&info) {
            debug!(device = %path, name = %info.name, "device does not match; not relayed");
            return;
        }

        let relay = DeviceRelay::new(
            info,
            Arc::clone(&self.sink),
            self.pause.clone(),
            self.toggler.clone(),
            RelayOptions {
                grab: self.config.grab_devices,
                movement: self.config.movement.clone(),
            },
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stopped = self.stopped_tx.clone();
        let task_path = path.to_string();
        let handle = tokio::spawn(async move {
            relay.run(source, shutdown_rx).await;
            // try_send: during shutdown the controller no longer drains this
            // channel, and the notification is only needed for live reaping.
            let _ = stopped.try_send(task_path);
        });

        self.tasks.insert(
            path.to_string(),
            RelayTask {
                shutdown: shutdown_tx,
                handle,
            },
        );
    }

    /// Cancels the relay for `path` and waits for its `Stopped` state before
    /// dropping the record.
    pub async fn remove_device(&mut self, path: &str) {
        let Some(task) = self.tasks.remove(path) else {
            debug!(device = %path, "no active relay to remove");
            return;
        };
        let _ = task.shutdown.send(true);
        if tokio::time::timeout(STOP_TIMEOUT, task.handle).await.is_err() {
            warn!(device = %path, "relay did not stop within {STOP_TIMEOUT:?}; task detached");
        }
    }

    /// Matching rule: auto-discovery with skip prefixes, or the allow-list.
    fn should_relay(&self, info: &DeviceInfo) -> bool {
        if self.config.auto_discover {
            let name = info.name.to_lowercase();
            return !self
                .config
                .skip_name_prefixes
                .iter()
                .any(|prefix| name.starts_with(&prefix.to_lowercase()));
        }
        self.config
            .identifiers
            .iter()
            .any(|id| id.matches(&info.path, &info.name, info.uniq.as_deref()))
    }

    /// Cancels every relay as one coordinated group and waits for the set,
    /// bounded by [`SHUTDOWN_TIMEOUT`]. A relay failing to stop is logged
    /// and abandoned; it cannot prevent the others from stopping cleanly.
    async fn shutdown_all(&mut self) {
        info!(active = self.tasks.len(), "shutting down all relays");
        let tasks: Vec<(String, RelayTask)> = self.tasks.drain().collect();
        for (_, task) in &tasks {
            let _ = task.shutdown.send(true);
        }

        let join_all = async {
            for (path, task) in tasks {
                if task.handle.await.is_err() {
                    warn!(device = %path, "relay task panicked during shutdown");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all).await.is_err() {
            warn!("shutdown timeout elapsed with relays still stopping");
        }
        info!("relay controller stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sink::SinkError;
    use hidrelay_core::event::{RawEvent, TranslatedReport};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// A provider over a fixed set of scripted devices. Opened sources park
    /// forever so relays stay alive until cancelled.
    struct ScriptedProvider {
        devices: StdHashMap<String, DeviceInfo>,
    }

    impl ScriptedProvider {
        fn new(devices: Vec<DeviceInfo>) -> Self {
            Self {
                devices: devices.into_iter().map(|d| (d.path.clone(), d)).collect(),
            }
        }
    }

    struct ParkedSource;

    #[async_trait]
    impl InputSource for ParkedSource {
        async fn next_event(&mut self) -> io::Result<Option<RawEvent>> {
            std::future::pending::<()>().await;
            unreachable!()
        }
        fn grab(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn ungrab(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl DeviceProvider for ScriptedProvider {
        async fn list(&self) -> Vec<DeviceInfo> {
            self.devices.values().cloned().collect()
        }

        async fn open(&self, path: &str) -> io::Result<(DeviceInfo, Box<dyn InputSource>)> {
            match self.devices.get(path) {
                Some(info) => Ok((info.clone(), Box::new(ParkedSource) as Box<dyn InputSource>)),
                None => Err(io::Error::new(io::ErrorKind::NotFound, "no such device")),
            }
        }
    }

    #[derive(Default)]
    struct NullSink {
        release_all_calls: Mutex<u32>,
    }

    #[async_trait]
    impl HidSink for NullSink {
        async fn apply(&self, _report: TranslatedReport) -> Result<(), SinkError> {
            Ok(())
        }
        async fn mouse_move(&self, _dx: i8, _dy: i8, _wheel: i8) -> Result<(), SinkError> {
            Ok(())
        }
        async fn release_all(&self) -> Result<(), SinkError> {
            *self.release_all_calls.lock().unwrap() += 1;
            Ok(())
        }
        async fn release_keyboard(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn device(path: &str, name: &str) -> DeviceInfo {
        DeviceInfo {
            path: path.to_string(),
            name: name.to_string(),
            uniq: None,
        }
    }

    fn make_controller(
        devices: Vec<DeviceInfo>,
        config: ControllerConfig,
    ) -> (RelayController, Arc<NullSink>) {
        let sink = Arc::new(NullSink::default());
        let controller = RelayController::new(
            Arc::new(ScriptedProvider::new(devices)),
            Arc::clone(&sink) as Arc<dyn HidSink>,
            PauseSignal::new(),
            None,
            config,
        );
        (controller, sink)
    }

    fn allow(config_ids: &[&str]) -> ControllerConfig {
        ControllerConfig {
            identifiers: config_ids.iter().map(|s| DeviceIdentifier::parse(s)).collect(),
            ..ControllerConfig::default()
        }
    }

    // ── Idempotence and matching ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_duplicate_add_results_in_one_relay() {
        let (mut ctrl, _) = make_controller(
            vec![device("/dev/input/event0", "BT Keyboard")],
            allow(&["/dev/input/event0"]),
        );

        ctrl.add_device("/dev/input/event0").await;
        ctrl.add_device("/dev/input/event0").await;

        assert_eq!(ctrl.active_count(), 1, "duplicate adds must be idempotent");
    }

    #[tokio::test]
    async fn test_non_matching_device_is_not_relayed() {
        let (mut ctrl, _) = make_controller(
            vec![device("/dev/input/event0", "Some Other Device")],
            allow(&["K380"]),
        );

        ctrl.add_device("/dev/input/event0").await;

        assert_eq!(ctrl.active_count(), 0);
    }

    #[tokio::test]
    async fn test_vanished_device_is_tolerated() {
        let (mut ctrl, _) = make_controller(vec![], allow(&["anything"]));
        ctrl.add_device("/dev/input/event7").await;
        assert_eq!(ctrl.active_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_discover_skips_configured_name_prefixes() {
        let config = ControllerConfig {
            auto_discover: true,
            ..ControllerConfig::default()
        };
        let (mut ctrl, _) = make_controller(
            vec![
                device("/dev/input/event0", "vc4-hdmi-0 HDMI Jack"),
                device("/dev/input/event1", "BT Mouse"),
            ],
            config,
        );

        ctrl.add_device("/dev/input/event0").await;
        ctrl.add_device("/dev/input/event1").await;

        assert!(!ctrl.is_active("/dev/input/event0"), "skip prefix must apply");
        assert!(ctrl.is_active("/dev/input/event1"));
    }

    #[tokio::test]
    async fn test_name_fragment_matching_is_case_insensitive() {
        let (mut ctrl, _) = make_controller(
            vec![device("/dev/input/event0", "Logitech K380 Keyboard")],
            allow(&["k380"]),
        );
        ctrl.add_device("/dev/input/event0").await;
        assert_eq!(ctrl.active_count(), 1);
    }

    // ── Removal and shutdown ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_remove_waits_for_stop_and_releases_keys() {
        let (mut ctrl, sink) = make_controller(
            vec![device("/dev/input/event0", "BT Keyboard")],
            allow(&["/dev/input/event0"]),
        );
        ctrl.add_device("/dev/input/event0").await;
        assert_eq!(ctrl.active_count(), 1);

        ctrl.remove_device("/dev/input/event0").await;

        assert_eq!(ctrl.active_count(), 0);
        assert_eq!(
            *sink.release_all_calls.lock().unwrap(),
            1,
            "the relay must reach Stopped (release path run) before removal completes"
        );
    }

    #[tokio::test]
    async fn test_remove_of_unknown_device_is_a_noop() {
        let (mut ctrl, _) = make_controller(vec![], ControllerConfig::default());
        ctrl.remove_device("/dev/input/event5").await;
        assert_eq!(ctrl.active_count(), 0);
    }

    #[tokio::test]
    async fn test_run_performs_initial_scan_and_shuts_down_cleanly() {
        let (ctrl, sink) = make_controller(
            vec![
                device("/dev/input/event0", "BT Keyboard"),
                device("/dev/input/event1", "BT Mouse"),
            ],
            ControllerConfig {
                auto_discover: true,
                ..ControllerConfig::default()
            },
        );

        let (_device_tx, device_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(ctrl.run(device_rx, shutdown_rx));

        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("controller must shut down within the timeout")
            .unwrap();

        assert_eq!(
            *sink.release_all_calls.lock().unwrap(),
            2,
            "every relay's release path must run during shutdown"
        );
    }

    #[tokio::test]
    async fn test_hotplug_add_and_remove_drive_relay_lifecycle() {
        let (ctrl, sink) = make_controller(
            vec![device("/dev/input/event3", "BT Keyboard")],
            allow(&["BT Keyboard"]),
        );

        let (device_tx, device_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(ctrl.run(device_rx, shutdown_rx));

        device_tx
            .send(DeviceEvent::Added {
                path: "/dev/input/event3".to_string(),
            })
            .await
            .unwrap();
        device_tx
            .send(DeviceEvent::Removed {
                path: "/dev/input/event3".to_string(),
            })
            .await
            .unwrap();
        tokio::task::yield_now().await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("controller must exit")
            .unwrap();

        assert_eq!(
            *sink.release_all_calls.lock().unwrap(),
            1,
            "the hot-plugged relay ran and released exactly once"
        );
    }
}
