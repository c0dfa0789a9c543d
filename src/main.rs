//! `fgd` — command-line companion for FG portable fire/gas detectors
//!
//! Drives the full session flow against a real detector: scan, connect,
//! passkey login, GATT refresh, then reads, writes, or live monitoring
//! depending on the subcommand.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use log::debug;

use fgd::alerts;
use fgd::bluez::BluezTransport;
use fgd::device_info;
use fgd::environmental;
use fgd::generic_access;
use fgd::link::BleTransport;
use fgd::login;
use fgd::media_control::{self, MediaControlState};
use fgd::notify;
use fgd::session::{Session, SessionManager};
use fgd::settings::{self, GasType};
use fgd::uuids;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "fgd")]
#[command(about = "BLE companion for FG portable fire/gas detectors")]
struct Args {
    /// Passkey written to the login service after connecting
    #[arg(long, default_value = "123456", global = true)]
    passkey: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List advertising devices, flagging FG detectors
    Scan {
        /// How long to listen, in seconds
        #[arg(long, default_value = "10")]
        duration: u64,
    },
    /// Connect and print a full device snapshot
    Info {
        /// Additionally dump the discovered capability table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Connect and stream live alert and methane updates until Ctrl-C
    Monitor,
    /// Write one settings value
    Set {
        /// One of: full-scale, alarm-level, warn-level, lowest-level,
        /// response-time, block-delay, gas-type, interval
        key: String,
        value: u16,
    },
    /// Switch the detector's operating mode
    Mode {
        /// One of: normal, alignment, zero-cal
        mode: String,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Scan { duration } => run_scan(duration).await,
        Command::Info { json } => run_info(&args.passkey, json).await,
        Command::Monitor => run_monitor(&args.passkey).await,
        Command::Set { ref key, value } => run_set(&args.passkey, key, value).await,
        Command::Mode { ref mode } => run_mode(&args.passkey, mode).await,
    }
}

// ============================================================================
// Session setup shared by every connected subcommand
// ============================================================================

/// Connect, log in, and force a GATT refresh so the post-login table is
/// the one we operate on
async fn open_session(
    passkey: &str,
) -> std::result::Result<(SessionManager, Arc<Session>), Box<dyn Error>> {
    let transport = Arc::new(BluezTransport::new().await?);
    let manager = SessionManager::new(transport);

    let session = match manager.connect().await {
        Some(session) => session,
        None => return Err("could not connect to an FG device".into()),
    };

    if !login::write_passkey(&session, passkey).await {
        manager.disconnect().await;
        return Err("passkey was rejected".into());
    }

    match manager.refresh_capabilities().await {
        Some(session) => Ok((manager, session)),
        None => Err("GATT refresh after login failed".into()),
    }
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_scan(duration: u64) -> std::result::Result<(), Box<dyn Error>> {
    let transport = BluezTransport::new().await?;
    let mut stream = transport.scan().await?;

    println!("🔍 Scanning for {} seconds...", duration);
    let deadline = tokio::time::sleep(Duration::from_secs(duration));
    tokio::pin!(deadline);
    let mut seen = 0usize;
    let mut fg_seen = 0usize;

    loop {
        tokio::select! {
            Some(adv) = stream.next() => {
                seen += 1;
                let name = adv.name.as_deref().unwrap_or("(unnamed)");
                let rssi = adv
                    .rssi
                    .map(|r| format!("{} dBm", r))
                    .unwrap_or_else(|| "?".to_string());
                if adv.name.as_deref().map(uuids::is_fg_device_name).unwrap_or(false) {
                    fg_seen += 1;
                    println!("  ✅ {}  {}  {}  <- FG detector", adv.address, name, rssi);
                } else {
                    println!("     {}  {}  {}", adv.address, name, rssi);
                }
            }
            _ = &mut deadline => break,
        }
    }

    println!("Seen {} devices, {} FG detectors", seen, fg_seen);
    Ok(())
}

async fn run_info(passkey: &str, json: bool) -> std::result::Result<(), Box<dyn Error>> {
    let (manager, session) = open_session(passkey).await?;

    let access = generic_access::read_generic_access(&session).await;
    let info = device_info::read_device_information(&session).await;
    let snapshot = settings::read_settings_snapshot(&session).await;
    let methane = environmental::read_methane(&session).await;
    let temperature = environmental::read_temperature(&session).await;
    let interval = environmental::read_measurement_interval(&session).await;
    let alert_word = alerts::read_alert_status(&session).await;

    println!("Device:        {}", access.device_name);
    if let Some(appearance) = access.appearance {
        println!("Appearance:    0x{:04x}", appearance);
    }
    println!("Manufacturer:  {}", info.manufacturer.as_deref().unwrap_or("-"));
    println!("Model:         {}", info.model_number.as_deref().unwrap_or("-"));
    println!("Serial:        {}", info.serial_number.as_deref().unwrap_or("-"));
    println!("System ID:     {}", info.system_id.as_deref().unwrap_or("-"));
    println!();
    print_setting("Full scale", snapshot.full_scale);
    print_setting("Alarm level", snapshot.alarm_level);
    print_setting("Warn level", snapshot.warn_level);
    print_setting("Lowest level", snapshot.lowest_level);
    print_setting("Response time", snapshot.response_time);
    print_setting("Block delay", snapshot.block_delay);
    println!(
        "Gas type:      {}",
        snapshot
            .gas_type
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!();
    print_setting("Methane", methane);
    print_setting("Temperature", temperature);
    print_setting("Interval", interval);
    println!();
    match alert_word {
        Some(word) => print_alert_word(word),
        None => println!("Alert status:  (read failed)"),
    }

    if json {
        println!();
        println!("{}", serde_json::to_string_pretty(session.services())?);
    }

    manager.disconnect().await;
    Ok(())
}

async fn run_monitor(passkey: &str) -> std::result::Result<(), Box<dyn Error>> {
    let (manager, session) = open_session(passkey).await?;

    let alert_sub = alerts::subscribe_alert_status(&session, "cli", |word| {
        print_alert_word(word);
    })
    .await;
    let methane_sub = environmental::subscribe_methane(&session, "cli", |value| {
        println!("🔥 Methane: {} LEL", value);
    })
    .await;
    if alert_sub.is_none() && methane_sub.is_none() {
        manager.disconnect().await;
        return Err("could not subscribe to any characteristic".into());
    }

    // Show the current state once; updates stream in from here on
    if let Some(word) = alerts::read_alert_status(&session).await {
        print_alert_word(word);
    }

    println!("📡 Monitoring, press Ctrl-C to stop...");
    tokio::signal::ctrl_c().await?;
    println!();

    if let Some(sub) = alert_sub {
        notify::unsubscribe(sub);
    }
    if let Some(sub) = methane_sub {
        notify::unsubscribe(sub);
    }
    manager.disconnect().await;
    Ok(())
}

async fn run_set(
    passkey: &str,
    key: &str,
    value: u16,
) -> std::result::Result<(), Box<dyn Error>> {
    let (manager, session) = open_session(passkey).await?;

    let ok = match key {
        "full-scale" => settings::write_full_scale(&session, value).await,
        "alarm-level" => settings::write_alarm_level(&session, value).await,
        "warn-level" => settings::write_warn_level(&session, value).await,
        "lowest-level" => settings::write_lowest_level(&session, value).await,
        "response-time" => settings::write_response_time(&session, value).await,
        "block-delay" => settings::write_block_delay(&session, value).await,
        "interval" => environmental::write_measurement_interval(&session, value).await,
        "gas-type" => match GasType::from_raw(value) {
            Some(gas) => settings::write_gas_type(&session, gas).await,
            None => {
                manager.disconnect().await;
                return Err(format!("unknown gas type {} (use 0..=2)", value).into());
            }
        },
        _ => {
            manager.disconnect().await;
            return Err(format!("unknown settings key '{}'", key).into());
        }
    };

    manager.disconnect().await;
    if ok {
        println!("✅ {} = {}", key, value);
        Ok(())
    } else {
        Err(format!("failed to write {}", key).into())
    }
}

async fn run_mode(passkey: &str, mode: &str) -> std::result::Result<(), Box<dyn Error>> {
    let target = match mode {
        "normal" => MediaControlState::Normal,
        "alignment" => MediaControlState::Alignment,
        "zero-cal" => MediaControlState::ZeroCalibration,
        _ => return Err(format!("unknown mode '{}' (use normal|alignment|zero-cal)", mode).into()),
    };

    let (manager, session) = open_session(passkey).await?;
    let ok = media_control::write_media_control_state(&session, target).await;
    if ok {
        // Read back what the firmware actually settled on
        match media_control::read_media_control_state(&session).await {
            Some(state) => println!("✅ Mode is now {}", state),
            None => println!("✅ Mode written ({}), read-back failed", target),
        }
    }
    manager.disconnect().await;
    if ok {
        Ok(())
    } else {
        Err(format!("failed to switch mode to {}", target).into())
    }
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_setting(label: &str, value: Option<u16>) {
    match value {
        Some(v) => println!("{:<14}{}", format!("{}:", label), v),
        None => println!("{:<14}-", format!("{}:", label)),
    }
}

fn print_alert_word(word: u16) {
    let status = fgd::decode_alert_status(word);
    if status.all_clear() {
        println!("🟢 Alert status 0x0000 — all clear");
        return;
    }
    let names: Vec<&str> = status.active.iter().map(|a| a.name.as_str()).collect();
    if let Some(top) = &status.top {
        println!(
            "🚨 Alert status 0x{:04x}: top={} (rank {}), active=[{}]",
            word,
            top.name,
            top.rank,
            names.join(", ")
        );
    }
    debug!("Alert detail: {:?}", status.active);
}
