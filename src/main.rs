//! RHS2116 relay - simulated headstage entry point
//!
//! Runs the firmware against a simulated chip. Host requests are read from
//! stdin as hex lines (one frame per line) and outbound batches are written
//! to stdout the same way. On end of input the device is shut down and the
//! final counters are printed as JSON to stderr.
//!
//! Usage: `rhs-relay [CONFIG]`

use anyhow::Context;
use rhs_relay::{
    chip::{SignalPattern, SimulatedChip},
    config::{default_config_path, DeviceConfig},
    relay::{parse_hex_line, WriterHostLink},
    Device,
};
use std::io::BufRead;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn load_config() -> anyhow::Result<DeviceConfig> {
    match std::env::args_os().nth(1) {
        Some(path) => DeviceConfig::load(&path)
            .with_context(|| format!("Loading config from {:?}", path)),
        None => Ok(default_config_path()
            .map(DeviceConfig::load_or_default)
            .unwrap_or_default()),
    }
}

fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_or_default()));
    let (file_layer, _guard) = match &config.logging.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .context("logging.file has no file name")?;
            let appender = tracing_appender::rolling::never(
                dir.unwrap_or_else(|| std::path::Path::new(".")),
                name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    tracing::info!("Starting RHS2116 relay (simulated headstage)");

    let chip = SimulatedChip::new()
        .with_pattern(0, SignalPattern::Sine { amplitude: 4000.0, period: 100 })
        .with_pattern(1, SignalPattern::Ramp { step: 64 });
    let link = WriterHostLink::new(std::io::stdout());
    let handle = Device::start(config, Box::new(chip), Box::new(link))
        .context("Starting device")?;

    let inbox = handle.inbox();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Reading stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_hex_line(line) {
            Some(frame) => {
                let _ = inbox.on_receive(&frame);
            }
            None => tracing::warn!("Ignoring malformed hex line: {}", line),
        }
    }

    tracing::info!("Input closed, shutting down...");
    let (sampler, relay) = handle.shutdown()?;
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "sampler": sampler,
            "relay": relay,
        }))?
    );
    Ok(())
}
