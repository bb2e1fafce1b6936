//! The per-device relay task.
//!
//! One relay owns one input device for its whole lifetime:
//!
//! ```text
//! Starting ─► Reading ─► (Paused ⇄ Reading) ─► Stopping ─► Stopped
//! ```
//!
//! In `Reading`, every raw event goes through the same pipeline: feed the
//! shortcut recognizers, drop the event if the pause signal is set (paused
//! means inert, never queued), otherwise translate and forward through the
//! gadget sink. Teardown — device removal, read error, or cancellation —
//! always stops the movement driver, emits compensating releases, and
//! returns the handle, on every exit path.
//!
//! Failures are isolated: nothing a relay does can cancel a sibling. The
//! controller only learns of termination through the relay's own completion.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hidrelay_core::event::{KeyAction, RawEvent};
use hidrelay_core::keymap::translate;
use hidrelay_core::pattern::{MovementConfig, PatternCursor};
use hidrelay_core::shortcut::TapSequenceDetector;

use super::pause::PauseSignal;
use super::sink::HidSink;
use super::toggler::ShortcutToggler;

/// Consecutive synthetic-movement write failures before auto-movement
/// disables itself.
const MAX_MOVEMENT_FAILURES: u32 = 5;

/// Consecutive real-input write failures before the relay gives up on the
/// device and stops itself.
const MAX_CONSECUTIVE_WRITE_FAILURES: u32 = 10;

/// Identity of an input device as the OS layer reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device node path, e.g. `/dev/input/event5`. Doubles as the relay key.
    pub path: String,
    /// Human-readable device name.
    pub name: String,
    /// Unique hardware identifier; for Bluetooth devices the peer MAC.
    pub uniq: Option<String>,
}

/// A stream of raw events from one input device.
///
/// The production implementation wraps an evdev event stream; tests script
/// events from a queue.
#[async_trait]
pub trait InputSource: Send {
    /// Waits for the next event. `Ok(None)` means a clean end of stream (the
    /// device was removed); an error means the read path broke.
    async fn next_event(&mut self) -> io::Result<Option<RawEvent>>;

    /// Acquires exclusive access to the device.
    fn grab(&mut self) -> io::Result<()>;

    /// Releases exclusive access.
    fn ungrab(&mut self) -> io::Result<()>;
}

/// Why a relay finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Cancelled by the controller (device removed or process shutdown).
    Cancelled,
    /// The device reached end of stream.
    Removed,
    /// The device read path or the sink failed beyond recovery.
    Failed,
}

/// Per-relay options resolved from operator configuration.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Grab the device exclusively while relaying is active.
    pub grab: bool,
    /// Movement pattern configuration for the toggle gesture.
    pub movement: MovementConfig,
}

/// The relay for a single input device.
pub struct DeviceRelay {
    info: DeviceInfo,
    sink: Arc<dyn HidSink>,
    pause: PauseSignal,
    toggler: Option<Arc<ShortcutToggler>>,
    options: RelayOptions,
    taps: TapSequenceDetector,
    movement: Option<MovementHandle>,
    grabbed: bool,
    consecutive_write_failures: u32,
}

struct MovementHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DeviceRelay {
    pub fn new(
        info: DeviceInfo,
        sink: Arc<dyn HidSink>,
        pause: PauseSignal,
        toggler: Option<Arc<ShortcutToggler>>,
        options: RelayOptions,
    ) -> Self {
        Self {
            info,
            sink,
            pause,
            toggler,
            options,
            taps: TapSequenceDetector::new(),
            movement: None,
            grabbed: false,
            consecutive_write_failures: 0,
        }
    }

    /// Whether the synthetic movement driver is currently running.
    pub fn movement_active(&self) -> bool {
        self.movement
            .as_ref()
            .map(|m| !m.task.is_finished())
            .unwrap_or(false)
    }

    /// Runs the relay until cancellation, device removal, or fatal error.
    ///
    /// The release path runs on every exit: movement driver stopped,
    /// compensating releases written, device ungrabbed. The source handle
    /// itself closes when it is dropped here.
    pub async fn run(
        mut self,
        mut source: Box<dyn InputSource>,
        mut shutdown: watch::Receiver<bool>,
    ) -> RelayOutcome {
        info!(device = %self.info.path, name = %self.info.name, "relay started");

        if self.options.grab {
            self.try_grab(source.as_mut());
        }

        let outcome = loop {
            tokio::select! {
                _ = shutdown.changed() => break RelayOutcome::Cancelled,
                result = source.next_event() => match result {
                    Ok(Some(event)) => {
                        if !self.handle_event(source.as_mut(), event).await {
                            break RelayOutcome::Failed;
                        }
                    }
                    Ok(None) => {
                        info!(device = %self.info.path, "device reached end of stream");
                        break RelayOutcome::Removed;
                    }
                    Err(e) => {
                        info!(device = %self.info.path, error = %e, "lost connection to device");
                        break RelayOutcome::Removed;
                    }
                },
            }
        };

        self.stop_movement().await;
        if let Err(e) = self.sink.release_all().await {
            warn!(device = %self.info.path, error = %e, "compensating release failed");
        }
        if self.grabbed {
            if let Err(e) = source.ungrab() {
                debug!(device = %self.info.path, error = %e, "ungrab on teardown failed");
            }
        }
        info!(device = %self.info.path, ?outcome, "relay stopped");
        outcome
    }

    /// Processes one event. Returns `false` when the relay should stop.
    async fn handle_event(&mut self, source: &mut dyn InputSource, event: RawEvent) -> bool {
        if let RawEvent::Key { code, action } = event {
            if self.taps.observe(code, action, Instant::now()) {
                self.toggle_movement().await;
            }
            if let Some(toggler) = &self.toggler {
                toggler.handle_key(code, action).await;
            }
        }

        let active = !self.pause.is_paused();
        if self.options.grab {
            self.sync_grab(source, active);
        }
        if !active {
            // Paused means inert: the event is dropped, not queued.
            return true;
        }

        let Some(report) = translate(&event) else {
            debug!(device = %self.info.path, ?event, "unmapped event skipped");
            return true;
        };

        match self.sink.apply(report).await {
            Ok(()) => {
                self.consecutive_write_failures = 0;
                true
            }
            Err(e) => {
                warn!(device = %self.info.path, endpoint = %e.endpoint(), error = %e, "forward failed");
                if e.is_disconnected() {
                    // Cable likely unplugged mid-write; pause until the link
                    // monitor sees it back.
                    self.pause.set_link(true);
                    return true;
                }
                self.consecutive_write_failures += 1;
                if self.consecutive_write_failures >= MAX_CONSECUTIVE_WRITE_FAILURES {
                    warn!(device = %self.info.path, "too many consecutive write failures; stopping relay");
                    return false;
                }
                true
            }
        }
    }

    /// Grabs or ungrabs to track the pause state. Grab failures are
    /// warnings: a device we cannot grab still relays.
    fn sync_grab(&mut self, source: &mut dyn InputSource, active: bool) {
        if active && !self.grabbed {
            self.try_grab(source);
        } else if !active && self.grabbed {
            match source.ungrab() {
                Ok(()) => {
                    self.grabbed = false;
                    debug!(device = %self.info.path, "ungrabbed");
                }
                Err(e) => warn!(device = %self.info.path, error = %e, "could not ungrab"),
            }
        }
    }

    fn try_grab(&mut self, source: &mut dyn InputSource) {
        match source.grab() {
            Ok(()) => {
                self.grabbed = true;
                debug!(device = %self.info.path, "grabbed exclusively");
            }
            Err(e) => warn!(device = %self.info.path, error = %e, "could not grab"),
        }
    }

    /// Flips the synthetic movement driver for this relay.
    async fn toggle_movement(&mut self) {
        if self.movement_active() {
            self.stop_movement().await;
            info!(device = %self.info.path, "auto-movement stopped by gesture");
            return;
        }
        // A previous driver may have disabled itself after repeated write
        // failures; reap it before starting fresh.
        self.movement = None;

        // The gesture leaves Control pressed on the downstream host; release
        // the keyboard before the cursor starts wandering.
        if let Err(e) = self.sink.release_keyboard().await {
            warn!(device = %self.info.path, error = %e, "pre-movement keyboard release failed");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let cursor = PatternCursor::new(self.options.movement.clone());
        let sink = Arc::clone(&self.sink);
        let device = self.info.path.clone();
        let task = tokio::spawn(movement_loop(sink, cursor, stop_rx, device));
        self.movement = Some(MovementHandle {
            stop: stop_tx,
            task,
        });
        info!(device = %self.info.path, "auto-movement started by gesture");
    }

    async fn stop_movement(&mut self) {
        if let Some(handle) = self.movement.take() {
            let _ = handle.stop.send(true);
            let _ = handle.task.await;
        }
    }
}

/// Drives the pattern cursor through the sink until stopped or until the
/// failure budget is spent. Synthetic movement is additive: it runs
/// alongside real-input forwarding, never instead of it.
async fn movement_loop(
    sink: Arc<dyn HidSink>,
    mut cursor: PatternCursor,
    mut stop: watch::Receiver<bool>,
    device: String,
) {
    let mut failures: u32 = 0;
    loop {
        let step = cursor.next_step(Instant::now());
        tokio::select! {
            _ = stop.changed() => break,
            _ = tokio::time::sleep(step.delay) => {}
        }

        let dx = step.dx.clamp(-127, 127) as i8;
        let dy = step.dy.clamp(-127, 127) as i8;
        match sink.mouse_move(dx, dy, 0).await {
            Ok(()) => failures = 0,
            Err(e) => {
                failures += 1;
                warn!(device = %device, error = %e, failures, "synthetic move failed");
                if failures >= MAX_MOVEMENT_FAILURES {
                    warn!(
                        device = %device,
                        "auto-movement disabled after {MAX_MOVEMENT_FAILURES} consecutive failures"
                    );
                    break;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sink::SinkError;
    use hidrelay_core::event::TranslatedReport;
    use hidrelay_core::report::Endpoint;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Scripted event source: yields queued events, then either ends the
    /// stream or parks forever (so cancellation paths can be exercised).
    struct ScriptedSource {
        events: VecDeque<RawEvent>,
        end_of_stream: bool,
        grabs: Arc<Mutex<Vec<bool>>>,
    }

    impl ScriptedSource {
        fn new(events: Vec<RawEvent>, end_of_stream: bool) -> Self {
            Self {
                events: events.into(),
                end_of_stream,
                grabs: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl InputSource for ScriptedSource {
        async fn next_event(&mut self) -> io::Result<Option<RawEvent>> {
            match self.events.pop_front() {
                Some(event) => Ok(Some(event)),
                None if self.end_of_stream => Ok(None),
                None => {
                    // Park until cancelled.
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        fn grab(&mut self) -> io::Result<()> {
            self.grabs.lock().unwrap().push(true);
            Ok(())
        }

        fn ungrab(&mut self) -> io::Result<()> {
            self.grabs.lock().unwrap().push(false);
            Ok(())
        }
    }

    /// Recording sink with an optional scripted error for `apply`.
    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<TranslatedReport>>,
        moves: Mutex<Vec<(i8, i8, i8)>>,
        release_all_calls: Mutex<u32>,
        release_keyboard_calls: Mutex<u32>,
        apply_errors: Mutex<VecDeque<SinkError>>,
    }

    impl RecordingSink {
        fn with_apply_errors(errors: Vec<SinkError>) -> Self {
            Self {
                apply_errors: Mutex::new(errors.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl HidSink for RecordingSink {
        async fn apply(&self, report: TranslatedReport) -> Result<(), SinkError> {
            if let Some(err) = self.apply_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.applied.lock().unwrap().push(report);
            Ok(())
        }

        async fn mouse_move(&self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError> {
            self.moves.lock().unwrap().push((dx, dy, wheel));
            Ok(())
        }

        async fn release_all(&self) -> Result<(), SinkError> {
            *self.release_all_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn release_keyboard(&self) -> Result<(), SinkError> {
            *self.release_keyboard_calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn key_press(code: u16) -> RawEvent {
        RawEvent::Key {
            code,
            action: KeyAction::Press,
        }
    }

    fn key_release(code: u16) -> RawEvent {
        RawEvent::Key {
            code,
            action: KeyAction::Release,
        }
    }

    fn make_relay(sink: Arc<RecordingSink>, pause: PauseSignal) -> DeviceRelay {
        DeviceRelay::new(
            DeviceInfo {
                path: "/dev/input/event9".to_string(),
                name: "test keyboard".to_string(),
                uniq: None,
            },
            sink as Arc<dyn HidSink>,
            pause,
            None,
            RelayOptions {
                grab: false,
                movement: MovementConfig::default(),
            },
        )
    }

    // ── Forwarding and pause gating ───────────────────────────────────────────

    #[tokio::test]
    async fn test_events_forward_in_order_when_unpaused() {
        let sink = Arc::new(RecordingSink::default());
        let pause = PauseSignal::new();
        let relay = make_relay(Arc::clone(&sink), pause);
        let source = ScriptedSource::new(
            vec![key_press(30), key_release(30), key_press(48)],
            true,
        );
        let (_tx, rx) = watch::channel(false);

        let outcome = relay.run(Box::new(source), rx).await;

        assert_eq!(outcome, RelayOutcome::Removed);
        let applied = sink.applied.lock().unwrap();
        assert_eq!(
            *applied,
            vec![
                TranslatedReport::Key {
                    usage: 0x04,
                    pressed: true
                },
                TranslatedReport::Key {
                    usage: 0x04,
                    pressed: false
                },
                TranslatedReport::Key {
                    usage: 0x05,
                    pressed: true
                },
            ],
            "events must forward in read order"
        );
    }

    #[tokio::test]
    async fn test_no_events_forward_while_paused() {
        let sink = Arc::new(RecordingSink::default());
        let pause = PauseSignal::new();
        pause.set_manual(true);
        let relay = make_relay(Arc::clone(&sink), pause);
        let source = ScriptedSource::new(vec![key_press(30), key_press(48)], true);
        let (_tx, rx) = watch::channel(false);

        relay.run(Box::new(source), rx).await;

        assert!(
            sink.applied.lock().unwrap().is_empty(),
            "zero writes may reach the sink while paused"
        );
    }

    #[tokio::test]
    async fn test_forwarding_resumes_after_pause_clears() {
        let sink = Arc::new(RecordingSink::default());
        let pause = PauseSignal::new();
        pause.set_link(true);
        let mut relay = make_relay(Arc::clone(&sink), pause.clone());
        let mut source = ScriptedSource::new(vec![], true);

        // Paused: dropped.
        assert!(relay.handle_event(&mut source, key_press(30)).await);
        assert!(sink.applied.lock().unwrap().is_empty());

        // Cleared: subsequent events flow again.
        pause.set_link(false);
        assert!(relay.handle_event(&mut source, key_press(48)).await);
        assert_eq!(sink.applied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_codes_are_skipped_silently() {
        let sink = Arc::new(RecordingSink::default());
        let relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        let source = ScriptedSource::new(
            vec![
                key_press(0x2FF), // unmapped
                RawEvent::Other {
                    event_type: 0,
                    code: 0,
                    value: 0,
                },
                key_press(30),
            ],
            true,
        );
        let (_tx, rx) = watch::channel(false);

        let outcome = relay.run(Box::new(source), rx).await;

        assert_eq!(outcome, RelayOutcome::Removed, "unknown codes never abort");
        assert_eq!(sink.applied.lock().unwrap().len(), 1);
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_teardown_emits_compensating_release() {
        let sink = Arc::new(RecordingSink::default());
        let relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        // Key goes down, then the device disappears with the key still held.
        let source = ScriptedSource::new(vec![key_press(30)], true);
        let (_tx, rx) = watch::channel(false);

        relay.run(Box::new(source), rx).await;

        assert_eq!(
            *sink.release_all_calls.lock().unwrap(),
            1,
            "teardown must release everything the relay pressed"
        );
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_pending_read_and_runs_release_path() {
        let sink = Arc::new(RecordingSink::default());
        let relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        // No events and no end-of-stream: the read parks forever.
        let source = ScriptedSource::new(vec![], false);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(relay.run(Box::new(source), rx));
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancellation must unblock the pending read")
            .unwrap();
        assert_eq!(outcome, RelayOutcome::Cancelled);
        assert_eq!(*sink.release_all_calls.lock().unwrap(), 1);
    }

    // ── Sink failure handling ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_disconnected_write_sets_link_pause_cause() {
        let sink = Arc::new(RecordingSink::with_apply_errors(vec![
            SinkError::Disconnected {
                endpoint: Endpoint::Keyboard,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "EPIPE"),
            },
        ]));
        let pause = PauseSignal::new();
        let mut relay = make_relay(Arc::clone(&sink), pause.clone());
        let mut source = ScriptedSource::new(vec![], true);

        assert!(relay.handle_event(&mut source, key_press(30)).await);
        assert!(pause.link_cause(), "EPIPE must flip the link pause cause");
        assert!(!pause.manual_cause());
    }

    #[tokio::test]
    async fn test_relay_stops_after_repeated_write_failures() {
        let errors: Vec<SinkError> = (0..MAX_CONSECUTIVE_WRITE_FAILURES)
            .map(|_| SinkError::Busy {
                endpoint: Endpoint::Keyboard,
                attempts: 3,
            })
            .collect();
        let sink = Arc::new(RecordingSink::with_apply_errors(errors));
        let mut relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        let mut source = ScriptedSource::new(vec![], true);

        for _ in 0..MAX_CONSECUTIVE_WRITE_FAILURES - 1 {
            assert!(relay.handle_event(&mut source, key_press(30)).await);
        }
        assert!(
            !relay.handle_event(&mut source, key_press(30)).await,
            "the relay must stop itself after repeated write failures"
        );
    }

    // ── Exclusive grab ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_grab_option_grabs_on_start_and_ungrabs_on_teardown() {
        let sink = Arc::new(RecordingSink::default());
        let mut relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        relay.options.grab = true;
        let source = ScriptedSource::new(vec![key_press(30)], true);
        let grabs = Arc::clone(&source.grabs);
        let (_tx, rx) = watch::channel(false);

        relay.run(Box::new(source), rx).await;

        assert_eq!(
            *grabs.lock().unwrap(),
            vec![true, false],
            "grab on activation, ungrab on teardown"
        );
    }

    #[tokio::test]
    async fn test_grab_follows_pause_state() {
        let sink = Arc::new(RecordingSink::default());
        let pause = PauseSignal::new();
        let mut relay = make_relay(Arc::clone(&sink), pause.clone());
        relay.options.grab = true;
        relay.grabbed = true; // as after activation
        let mut source = ScriptedSource::new(vec![], true);
        let grabs = Arc::clone(&source.grabs);

        // Pausing ungrabs so other consumers see the device again…
        pause.set_manual(true);
        relay.handle_event(&mut source, key_press(30)).await;
        assert_eq!(*grabs.lock().unwrap(), vec![false]);

        // …and resuming re-grabs.
        pause.set_manual(false);
        relay.handle_event(&mut source, key_press(30)).await;
        assert_eq!(*grabs.lock().unwrap(), vec![false, true]);
    }

    // ── Toggle gesture and movement driver ────────────────────────────────────

    #[tokio::test]
    async fn test_five_control_taps_toggle_movement_driver() {
        let sink = Arc::new(RecordingSink::default());
        let mut relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        let mut source = ScriptedSource::new(vec![], true);

        for _ in 0..5 {
            relay.handle_event(&mut source, key_press(29)).await;
            relay.handle_event(&mut source, key_release(29)).await;
        }
        assert!(relay.movement_active(), "5 taps must start auto-movement");
        assert_eq!(
            *sink.release_keyboard_calls.lock().unwrap(),
            1,
            "keyboard must be released before movement starts"
        );

        for _ in 0..5 {
            relay.handle_event(&mut source, key_press(29)).await;
            relay.handle_event(&mut source, key_release(29)).await;
        }
        assert!(!relay.movement_active(), "5 more taps must stop it");
    }

    #[tokio::test]
    async fn test_control_presses_still_forward_while_counting_taps() {
        // The gesture observes, it does not consume: the Control key-downs
        // themselves must reach the sink.
        let sink = Arc::new(RecordingSink::default());
        let mut relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        let mut source = ScriptedSource::new(vec![], true);

        relay.handle_event(&mut source, key_press(29)).await;
        relay.handle_event(&mut source, key_release(29)).await;

        let applied = sink.applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(
            applied[0],
            TranslatedReport::Key {
                usage: 0xE0,
                pressed: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_movement_driver_writes_motion_through_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let mut relay = make_relay(Arc::clone(&sink), PauseSignal::new());
        let mut source = ScriptedSource::new(vec![], true);

        for _ in 0..5 {
            relay.handle_event(&mut source, key_press(29)).await;
        }
        assert!(relay.movement_active());

        // Paused tokio time auto-advances through the step delays.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            if !sink.moves.lock().unwrap().is_empty() {
                break;
            }
        }
        assert!(
            !sink.moves.lock().unwrap().is_empty(),
            "movement driver must emit synthetic motion"
        );

        relay.stop_movement().await;
    }
}
