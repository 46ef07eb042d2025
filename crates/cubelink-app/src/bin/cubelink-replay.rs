//! Cubelink capture replay.
//!
//! Feeds a recorded notification capture through the full session stack and
//! logs every host event.
//!
//! # Usage
//!
//! ```bash
//! # Identifier recovered from the advertisement
//! cubelink-replay capture.txt
//!
//! # Identifier supplied by hand, with frame-level logging
//! RUST_LOG=cubelink_client=trace cubelink-replay capture.txt --identifier AB:12:34:62:BC:15
//! ```

use std::time::Duration;

use clap::Parser;
use cubelink_app::{ReplayLink, Runtime, RuntimeConfig, SystemEnv};
use cubelink_client::{HostCommand, HostEvent, HostEventKind, LinkState};
use cubelink_crypto::DeviceId;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Replay a smart cube capture through the session stack
#[derive(Parser, Debug)]
#[command(name = "cubelink-replay")]
#[command(about = "Replay a smart cube notification capture")]
#[command(version)]
struct Args {
    /// Capture file (adv / notify / wait records)
    capture: String,

    /// Device identifier, when the advertisement does not carry one
    #[arg(short, long)]
    identifier: Option<String>,

    /// Seconds to wait for an advertisement
    #[arg(long, default_value = "10")]
    discovery_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let capture = std::fs::read_to_string(&args.capture)?;
    let link = ReplayLink::parse(&capture)?;
    let known = args.identifier.as_deref().map(str::parse::<DeviceId>).transpose()?;
    tracing::info!(
        capture = %args.capture,
        notifications = link.remaining_notifications(),
        "replay starting"
    );

    let config = RuntimeConfig {
        discovery_timeout: Duration::from_secs(args.discovery_timeout),
        ..RuntimeConfig::default()
    };
    let (runtime, mut handle) = Runtime::new(link, SystemEnv::new(), config);
    let runtime = tokio::spawn(runtime.run());

    let mut link_states = None;
    for (kind, mut events) in handle.events.take_all() {
        if kind == HostEventKind::LinkState {
            link_states = Some(events);
            continue;
        }
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                log_event(&event);
            }
        });
    }

    handle.commands.send(HostCommand::Connect(known)).await?;

    if let Some(mut states) = link_states {
        let mut was_connected = false;
        while let Some(event) = states.recv().await {
            let HostEvent::LinkState(state) = event else {
                continue;
            };
            tracing::info!(?state, "link state");
            match state {
                LinkState::Connected => was_connected = true,
                LinkState::Reconnecting if was_connected => break,
                LinkState::Disconnected => break,
                LinkState::Connecting | LinkState::Reconnecting => {},
            }
        }
    }

    drop(handle.commands);
    let runtime = runtime.await?;
    tracing::info!(
        writes = runtime.link().writes().len(),
        facelets = %runtime.session().display_facelets(),
        "replay finished"
    );

    Ok(())
}

fn log_event(event: &HostEvent) {
    match event {
        HostEvent::Move { mv, facelets, timestamp } => {
            tracing::info!(%mv, %facelets, timestamp, "move");
        },
        HostEvent::Solved { accumulated_moves, .. } => {
            tracing::info!(accumulated_moves, "solved");
        },
        HostEvent::Error { kind, message } => tracing::error!(?kind, %message, "session error"),
        other => tracing::info!(event = ?other, "event"),
    }
}
