//! hidrelayd entry point.
//!
//! Wires the OS adapters to the relay controller and runs the Tokio event
//! loop until a termination signal arrives.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ GadgetSink            -- /dev/hidg0..2 transports, retrying writes
//!  └─ PauseSignal           -- manual + link causes, ORed
//!  └─ LinkStateMonitor      -- /sys/class/udc/<udc>/state poll (Tokio task)
//!  └─ hotplug monitor       -- udev netlink socket (dedicated thread)
//!  └─ RelayController       -- one relay task per matching input device
//! ```
//!
//! Startup fails (non-zero exit) only when no gadget endpoint exists at all;
//! individually missing endpoints degrade with a warning and are reopened
//! lazily once the gadget comes up.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hidrelay_core::identifier::DeviceIdentifier;
use hidrelay_core::shortcut::ChordDetector;

use hidrelay_daemon::application::controller::{ControllerConfig, DeviceProvider, RelayController};
use hidrelay_daemon::application::pause::PauseSignal;
use hidrelay_daemon::application::sink::HidSink;
use hidrelay_daemon::application::toggler::ShortcutToggler;
use hidrelay_daemon::infrastructure::gadget::{hidg::HidgTransport, GadgetSink};
use hidrelay_daemon::infrastructure::hotplug;
use hidrelay_daemon::infrastructure::input::EvdevProvider;
use hidrelay_daemon::infrastructure::link_state::{
    find_udc_state_path, udc_state_path, LinkStateMonitor,
};
use hidrelay_daemon::infrastructure::storage::{default_config_path, load_movement_config};

/// Relay Bluetooth (or any evdev) input devices to USB gadget HID endpoints.
#[derive(Debug, Parser)]
#[command(name = "hidrelayd", version, about)]
struct Args {
    /// Device to relay: /dev/input/event* path, MAC address, or name
    /// fragment. Repeatable.
    #[arg(short = 'i', long = "device", value_name = "ID")]
    devices: Vec<String>,

    /// Relay all input devices except those skipped by name prefix.
    #[arg(short, long)]
    auto_discover: bool,

    /// Device-name prefix excluded from auto-discovery. Repeatable.
    #[arg(long, value_name = "PREFIX", default_values_t = vec![String::from("vc4-hdmi")])]
    skip_name_prefix: Vec<String>,

    /// Grab devices for exclusive access while relaying is active.
    #[arg(short, long)]
    grab_devices: bool,

    /// Pause/resume chord, e.g. "LCTRL+LSHIFT+F12". Disabled when omitted.
    #[arg(long, value_name = "CHORD")]
    pause_shortcut: Option<String>,

    /// Movement pattern configuration file
    /// (default: /etc/hidrelay/patterns.toml).
    #[arg(long, value_name = "PATH")]
    pattern_config: Option<PathBuf>,

    /// Keyboard gadget endpoint.
    #[arg(long, value_name = "PATH", default_value = "/dev/hidg0")]
    keyboard_gadget: PathBuf,

    /// Mouse gadget endpoint.
    #[arg(long, value_name = "PATH", default_value = "/dev/hidg1")]
    mouse_gadget: PathBuf,

    /// Consumer-control gadget endpoint.
    #[arg(long, value_name = "PATH", default_value = "/dev/hidg2")]
    consumer_gadget: PathBuf,

    /// UDC name for cable-state monitoring (auto-detected when omitted).
    #[arg(long, value_name = "NAME")]
    udc: Option<String>,

    /// List available input devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let provider = Arc::new(EvdevProvider::new());

    if args.list_devices {
        for info in provider.list().await {
            println!(
                "{}\t{}\t{}",
                info.path,
                info.name,
                info.uniq.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    info!("hidrelayd starting");

    // ── Gadget endpoints ──────────────────────────────────────────────────────
    let gadget_paths = [
        &args.keyboard_gadget,
        &args.mouse_gadget,
        &args.consumer_gadget,
    ];
    if gadget_paths.iter().all(|p| !p.exists()) {
        anyhow::bail!(
            "no gadget endpoints available ({}); is the USB gadget configured?",
            gadget_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    for path in gadget_paths {
        if !path.exists() {
            warn!(endpoint = %path.display(), "gadget endpoint missing; will retry once it appears");
        }
    }

    let sink: Arc<dyn HidSink> = Arc::new(GadgetSink::new(
        Box::new(HidgTransport::new(&args.keyboard_gadget)),
        Box::new(HidgTransport::new(&args.mouse_gadget)),
        Box::new(HidgTransport::new(&args.consumer_gadget)),
    ));

    // ── Pause signal and shortcut toggler ─────────────────────────────────────
    let pause = PauseSignal::new();

    let toggler = match &args.pause_shortcut {
        Some(spec) => {
            let chord = ChordDetector::parse(spec)
                .with_context(|| format!("invalid --pause-shortcut {spec:?}"))?;
            info!(chord = %spec, "pause shortcut armed");
            Some(Arc::new(ShortcutToggler::new(
                chord,
                pause.clone(),
                Arc::clone(&sink),
            )))
        }
        None => None,
    };

    // ── Shutdown plumbing ─────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let running = Arc::new(AtomicBool::new(true));

    {
        let running = Arc::clone(&running);
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                running.store(false, Ordering::Relaxed);
                let _ = shutdown_tx.send(true);
            }
        });
    }

    // ── Gadget-link state monitor ─────────────────────────────────────────────
    let state_path = match &args.udc {
        Some(name) => Some(udc_state_path(name)),
        None => find_udc_state_path(),
    };
    match state_path {
        Some(path) if path.exists() => {
            let monitor = LinkStateMonitor::new(path, pause.clone());
            tokio::spawn(monitor.run(shutdown_rx.clone()));
        }
        Some(path) => {
            warn!(state_file = %path.display(), "UDC state file not found; cable monitoring unavailable");
        }
        None => {
            warn!("no UDC registered; cable monitoring unavailable");
        }
    }

    // ── Hot-plug monitor ──────────────────────────────────────────────────────
    // The fallback channel stays open (sender parked in `_hotplug_keepalive`)
    // so the controller's event loop behaves identically without udev.
    let (device_rx, _hotplug_keepalive) = match hotplug::start_hotplug_monitor(Arc::clone(&running))
    {
        Ok(rx) => (rx, None),
        Err(e) => {
            warn!(error = %e, "hot-plug monitoring unavailable; only present devices will relay");
            let (tx, rx) = tokio::sync::mpsc::channel(1);
            (rx, Some(tx))
        }
    };

    // ── Relay controller ──────────────────────────────────────────────────────
    let config = ControllerConfig {
        identifiers: args
            .devices
            .iter()
            .map(|s| DeviceIdentifier::parse(s))
            .collect(),
        auto_discover: args.auto_discover,
        skip_name_prefixes: args.skip_name_prefix.clone(),
        grab_devices: args.grab_devices,
        movement: load_movement_config(
            &args.pattern_config.clone().unwrap_or_else(default_config_path),
        ),
    };
    if config.identifiers.is_empty() && !config.auto_discover {
        warn!("no --device given and --auto-discover off; nothing will relay");
    }

    let controller = RelayController::new(provider, sink, pause, toggler, config);
    controller.run(device_rx, shutdown_rx).await;

    running.store(false, Ordering::Relaxed);
    info!("hidrelayd stopped");
    Ok(())
}
