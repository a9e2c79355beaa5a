//! The tracker side: a native messaging host that the browser extension launches. It reads
//! lifecycle events from stdin, keeps one [session::Tracker] and writes durations to the store.

use std::path::PathBuf;

use anyhow::Result;
use processing::ProcessingModule;
use session::Tracker;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    host::{
        native_messaging::{write_frame, MessageReader},
        HostMessage, OutgoingMessage, ReportedTabs,
    },
    store::{json_file::JsonFileStore, KeyValueStore},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod domain;
pub mod probe;
pub mod processing;
pub mod session;
pub mod shutdown;

pub const DEFAULT_IDLE_DETECTION_INTERVAL_SECS: u32 = 60;

const MESSAGE_QUEUE_SIZE: usize = 32;

pub struct HostConfig {
    pub idle_detection_interval_secs: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            idle_detection_interval_secs: DEFAULT_IDLE_DETECTION_INTERVAL_SECS,
        }
    }
}

/// Represents the starting point for the host. Talks to the browser over stdin/stdout until
/// the browser disconnects or the process is interrupted.
pub async fn start_host(dir: PathBuf, config: HostConfig) -> Result<()> {
    let store = JsonFileStore::in_dir(&dir)?;
    info!("Tracking into {:?}", store.path());
    run_host(
        tokio::io::stdin(),
        tokio::io::stdout(),
        store,
        DefaultClock,
        config,
    )
    .await
}

/// Wires the reader, the tracker and shutdown detection together over arbitrary streams.
pub async fn run_host<S: KeyValueStore>(
    input: impl AsyncRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
    store: S,
    clock: impl Clock,
    config: HostConfig,
) -> Result<()> {
    write_frame(
        &mut output,
        &OutgoingMessage::Configure {
            idle_detection_interval_secs: config.idle_detection_interval_secs,
        },
    )
    .await?;

    let (sender, receiver) = mpsc::channel::<HostMessage>(MESSAGE_QUEUE_SIZE);
    let shutdown_token = CancellationToken::new();

    let reader = MessageReader::new(input, sender, shutdown_token.clone());
    let tracker = create_tracker(store, clock);
    let processor = ProcessingModule::new(receiver, tracker);

    let (_, reading_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        reader.run(),
        processor.run(),
    );

    if let Err(reading_result) = &reading_result {
        error!("Reading module got an error {:?}", reading_result);
    }

    if let Err(processing_result) = &processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    reading_result?;
    processing_result?;
    Ok(())
}

fn create_tracker<S: KeyValueStore>(store: S, clock: impl Clock) -> Tracker<S> {
    Tracker::new(store, Box::new(ReportedTabs::default()), Box::new(clock))
}
