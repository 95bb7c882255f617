//! Print the messages a study session sends to the display process.
//!
//! Stands in for the display process when running the study without it.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use study::fifo::FifoSink;
use study::DisplayMessage;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "study_listen")]
#[command(author, version, about = "Print study display messages read from the FIFO")]
struct Args {
    /// FIFO written by the study runner
    #[arg(short, long, default_value = "../studyfifo")]
    fifo: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    if FifoSink::new(&args.fifo).ensure_fifo()? {
        info!("Created FIFO {}", args.fifo.display());
    }
    info!("Listening on {}", args.fifo.display());

    loop {
        // Blocks until the runner opens the pipe; EOF once it closes it again
        let mut raw = String::new();
        File::open(&args.fifo)
            .and_then(|mut fifo| fifo.read_to_string(&mut raw))
            .with_context(|| format!("Failed to read {}", args.fifo.display()))?;
        if raw.is_empty() {
            continue;
        }

        match DisplayMessage::parse(&raw) {
            Ok(message) if message.is_finished() => {
                info!("Study finished");
                return Ok(());
            }
            Ok(message) => info!(
                marker = %message.marker,
                scenario = %message.scenario,
                framerate = message.framerate,
                timeout = message.timeout,
                "Display message"
            ),
            Err(e) => warn!("Unreadable message {raw:?}: {e}"),
        }
    }
}
