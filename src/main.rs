#![forbid(unsafe_code)]

mod applier;
mod arranger;
mod browser;
mod config;
mod constants;
mod geometry;
mod matcher;
mod monitor;
mod normalize;
mod platform;
mod sync;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use applier::ProfileApplier;
use config::profile::{Profile, SavedWindow};
use config::ProfileStore;
use sync::{SyncEngine, SyncMessage};

#[derive(Parser)]
#[command(
    name = "winkeep",
    version,
    about = "Capture, restore, and sync window layout profiles"
)]
struct Cli {
    /// Profiles file to use instead of the default location
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved profiles
    List,
    /// Show the saved windows of one profile
    Show { name: String },
    /// Capture the current window layout as a profile
    Capture {
        name: String,
        /// Mirror minimize/maximize/foreground across this profile's windows
        #[arg(long)]
        sync: bool,
    },
    /// Restore a profile
    Apply {
        name: String,
        /// Launch programs whose windows are not currently open
        #[arg(long)]
        launch_missing: bool,
        /// Force every window onto this monitor (1-based index)
        #[arg(long)]
        monitor: Option<usize>,
    },
    /// Delete a saved profile
    Delete { name: String },
    /// Run the synchronization engine until interrupted
    Watch,
}

fn main() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let mut store = ProfileStore::new(cli.profiles.unwrap_or_else(ProfileStore::default_path));
    store.load()?;

    match cli.command {
        Command::List => list_profiles(&store),
        Command::Show { name } => show_profile(&store, &name)?,
        Command::Capture { name, sync } => capture_profile(&mut store, name, sync)?,
        Command::Apply {
            name,
            launch_missing,
            monitor,
        } => apply_profile(&store, &name, launch_missing, monitor)?,
        Command::Delete { name } => {
            if store.delete_profile(&name)? {
                println!("deleted {name}");
            } else {
                bail!("profile not found: {name}");
            }
        }
        Command::Watch => watch(&store)?,
    }

    Ok(())
}

fn list_profiles(store: &ProfileStore) {
    if store.data.profiles.is_empty() {
        println!("no profiles saved yet");
        return;
    }
    for profile in &store.data.profiles {
        let sync = if profile.sync { ", sync" } else { "" };
        println!("{}  ({} windows{sync})", profile.name, profile.windows.len());
    }
}

fn show_profile(store: &ProfileStore, name: &str) -> Result<()> {
    let profile = store
        .data
        .find_by_name(name)
        .with_context(|| format!("profile not found: {name}"))?;

    println!("{}  (sync: {})", profile.name, profile.sync);
    for window in &profile.windows {
        let rect = window.rect;
        let place = match (&window.snap, &window.monitor) {
            (Some(snap), Some(m)) => format!("{snap:?} on {}", m.name),
            (None, Some(m)) => format!("on {}", m.name),
            _ => "absolute".to_string(),
        };
        println!(
            "  {} | {}  [{},{} {}x{}]  {place}",
            window.rule.exe, window.rule.title, rect.x, rect.y, rect.w, rect.h
        );
    }
    Ok(())
}

fn capture_profile(store: &mut ProfileStore, name: String, sync: bool) -> Result<()> {
    let sys = platform::native()?;
    let monitors = sys.monitors()?;
    let candidates = sys.enumerate(false)?;

    let mut windows = Vec::new();
    for candidate in &candidates {
        let rect = match sys.window_rect(candidate.handle) {
            Ok(rect) => rect,
            Err(err) => {
                warn!(handle = candidate.handle, error = %err, "skipping window during capture");
                continue;
            }
        };
        let state = sys.window_state(candidate.handle);
        windows.push(SavedWindow::capture(candidate, rect, state, &monitors));
    }

    if windows.is_empty() {
        bail!("no windows to capture");
    }

    let now = unix_seconds().to_string();
    let count = windows.len();
    store.upsert_profile(Profile {
        id: format!("{name}-{now}"),
        name: name.clone(),
        sync,
        created_at: now.clone(),
        updated_at: now,
        windows,
        target_desktop_id: None,
    })?;

    info!(profile = %name, windows = count, "profile captured");
    println!("captured {count} window(s) into {name}");
    Ok(())
}

fn apply_profile(
    store: &ProfileStore,
    name: &str,
    launch_missing: bool,
    monitor_index: Option<usize>,
) -> Result<()> {
    let sys = platform::native()?;

    let forced = match monitor_index {
        Some(index) => {
            let monitors = sys.monitors()?;
            let monitor = monitors
                .get(index.wrapping_sub(1))
                .cloned()
                .with_context(|| format!("monitor {index} not found ({} attached)", monitors.len()))?;
            Some(monitor)
        }
        None => None,
    };

    let applier = ProfileApplier::new(sys.as_ref(), &store.data.settings);
    let result = applier.apply_by_name(&store.data, name, launch_missing, forced.as_ref());

    println!("{}", result.summary(name));
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    for failure in &result.failures {
        println!("  failed: {failure}");
    }
    Ok(())
}

fn watch(store: &ProfileStore) -> Result<()> {
    let mut sys = platform::native()?;

    if !(store.data.settings.sync_enabled && store.data.has_any_sync_profile()) {
        bail!("sync is disabled or no profile has sync enabled");
    }

    let (tx, rx) = mpsc::channel();
    let mut engine = SyncEngine::new(tx.clone());

    // Bridge hook events from the capability surface into the engine loop.
    // A hook delivery thread must never stall or die with the engine still
    // running, so the bridge does nothing but forward.
    let (hook_tx, hook_rx) = mpsc::channel();
    {
        let tx = tx.clone();
        thread::spawn(move || {
            for event in hook_rx {
                if tx.send(SyncMessage::Hook(event)).is_err() {
                    break;
                }
            }
        });
    }

    engine.update_hooks(sys.as_mut(), &store.data, &hook_tx)?;
    info!("watching window events");

    for message in rx {
        engine.handle_message(sys.as_ref(), &store.data, message);
    }
    Ok(())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
