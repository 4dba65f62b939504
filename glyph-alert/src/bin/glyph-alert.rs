//! Run one glyph alert off-device.
//!
//! Drives the stage machine against logging peripherals and prints every
//! state change as a JSON line on stdout. Ctrl-C stops the alert.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufReadExt, BufReader};

use glyph_alert::alert::{AlertMode, MachineOptions, Peripherals, SnapshotView};
use glyph_alert::feature::Feature;
use glyph_alert::hw_trait::{ExclusiveWakeLock, SoundClock, SoundPlayer};
use glyph_alert::settings::{MemorySettings, SettingsStore};
use glyph_alert::sim::{LoggingAnimationDriver, LoggingSoundPlayer};
use glyph_alert::tracing::{init_journald_or_stdout, prelude::*};

/// Nominal length of the simulated alert sound.
const SIM_SOUND_LENGTH: Duration = Duration::from_secs(8);

struct Args {
    feature: Feature,
    mode: Option<AlertMode>,
    options: MachineOptions,
    sync_to_sound: bool,
    manual: bool,
}

fn usage() -> ! {
    let features: Vec<String> = Feature::iter().map(|f| f.to_string()).collect();
    let modes: Vec<String> = AlertMode::iter().map(|m| m.to_string()).collect();

    eprintln!("Usage: glyph-alert <feature> [options]");
    eprintln!();
    eprintln!("Features: {}", features.join(", "));
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --mode <mode>          Alert mode ({})", modes.join(", "));
    eprintln!("  --test-mode            Countdown only, never arm the alert");
    eprintln!("  --skip-confirmation    Start the alert immediately");
    eprintln!("  --sync-sound           Stretch the alert to the sound length");
    eprintln!("  --manual               Wait for Enter on stdin to confirm");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG    Log filter (default: info)");
    std::process::exit(1);
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let Some(feature) = args.next() else {
        usage();
    };
    let feature = Feature::from_str(&feature)
        .with_context(|| format!("Unknown feature: {feature}"))?;

    let mut parsed = Args {
        feature,
        mode: None,
        options: MachineOptions::default(),
        sync_to_sound: false,
        manual: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let Some(value) = args.next() else {
                    bail!("--mode needs a value");
                };
                let mode = AlertMode::from_str(&value)
                    .with_context(|| format!("Unknown mode: {value}"))?;
                parsed.mode = Some(mode);
            }
            "--test-mode" => parsed.options.test_mode = true,
            "--skip-confirmation" => parsed.options.skip_confirmation = true,
            "--sync-sound" => parsed.sync_to_sound = true,
            "--manual" => parsed.manual = true,
            "-h" | "--help" => usage(),
            other => bail!("Unknown option: {other}"),
        }
    }

    Ok(parsed)
}

async fn wait_for_enter() -> Result<()> {
    eprintln!("Press Enter to confirm, Ctrl-C to cancel");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines.next_line().await.context("reading stdin")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_journald_or_stdout();
    let args = parse_args()?;

    let store = MemorySettings::new();
    let mut settings = store.get(args.feature);
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }
    settings.sync_to_sound |= args.sync_to_sound;
    store.set(args.feature, settings);

    let sound = Arc::new(LoggingSoundPlayer::new(SIM_SOUND_LENGTH));
    let peripherals = Peripherals {
        animation: Arc::new(LoggingAnimationDriver::new()),
        wake_lock: Arc::new(ExclusiveWakeLock::new()),
        sound: Some(sound.clone() as Arc<dyn SoundPlayer>),
    };

    let machine = args
        .feature
        .prepare(&store, Some(sound.as_ref() as &dyn SoundClock))
        .into_machine(peripherals, args.options)?;

    let mut updates = machine.updates();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let confirm = async {
        if args.manual {
            wait_for_enter().await
        } else {
            Ok(())
        }
    };
    tokio::pin!(confirm);
    let mut confirmed = args.options.skip_confirmation;
    let mut interrupted = false;

    loop {
        tokio::select! {
            result = &mut ctrl_c, if !interrupted => {
                result.context("installing Ctrl-C handler")?;
                interrupted = true;
                info!("Interrupted, stopping alert");
                machine.stop();
            }
            result = &mut confirm, if !confirmed => {
                result?;
                confirmed = true;
                machine.confirm_and_proceed();
            }
            next = updates.next() => {
                let Some(snapshot) = next else {
                    break;
                };
                let view = SnapshotView::from(&snapshot);
                println!("{}", serde_json::to_string(&view)?);
                if snapshot.stage.is_terminal() {
                    break;
                }
            }
        }
    }

    info!(stage = %machine.current_stage(), "Alert finished");
    Ok(())
}
