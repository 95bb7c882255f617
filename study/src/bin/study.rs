//! Run a marker visibility study session for one participant.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shared::duration_arg::DurationArg;
use study::display_mode::{NoopRateSetter, RefreshRateSetter};
use study::fifo::FifoSink;
use study::input::{crlf_stdout, KeySource};
use study::trial_log::TrialLog;
use study::{Schedule, Session, StudyConfig, StudyRunner};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "study")]
#[command(author, version, about = "Marker visibility study runner")]
struct Args {
    /// Participant id written to every log row
    #[arg(short = 'i', long = "participant-id", alias = "participantID")]
    participant_id: String,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// FIFO read by the display process
    #[arg(long)]
    fifo: Option<PathBuf>,

    /// CSV rating log
    #[arg(long)]
    log: Option<PathBuf>,

    /// Viewing time per trial (e.g. "5s", "2500ms")
    #[arg(long)]
    timeout: Option<DurationArg>,

    /// Passes over all conditions
    #[arg(long)]
    passes: Option<usize>,

    /// Do not call xrandr; only log the requested refresh rates
    #[arg(long)]
    no_xrandr: bool,

    /// Seed for reproducible condition order
    #[arg(long)]
    seed: Option<u64>,

    /// Create the FIFO if it does not exist
    #[arg(long)]
    create_fifo: bool,
}

fn load_config(args: &Args) -> Result<StudyConfig> {
    let mut config = match &args.config {
        Some(path) => StudyConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StudyConfig::default(),
    };

    if let Some(fifo) = &args.fifo {
        config.fifo_path = fifo.clone();
    }
    if let Some(log) = &args.log {
        config.log_path = log.clone();
    }
    if let Some(timeout) = args.timeout {
        config.trial_timeout = timeout;
    }
    if let Some(passes) = args.passes {
        config.passes = passes;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(crlf_stdout)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    };
    let schedule = Schedule::new(config.conditions.clone(), config.passes, rng);
    let mut session = Session::new(schedule);

    let sink = FifoSink::new(&config.fifo_path);
    if args.create_fifo && sink.ensure_fifo()? {
        info!("Created FIFO {}", sink.path().display());
    }

    let rates: Box<dyn RefreshRateSetter> = if args.no_xrandr {
        Box::new(NoopRateSetter)
    } else {
        Box::new(config.xrandr())
    };

    let log = TrialLog::open(&config.log_path)
        .with_context(|| format!("Failed to open log {}", config.log_path.display()))?;

    info!(
        participant = %args.participant_id,
        trials = session.total_trials(),
        timeout = %config.trial_timeout,
        "Study ready"
    );

    let mut runner = StudyRunner::new(
        args.participant_id.clone(),
        sink,
        rates,
        log,
        config.trial_timeout(),
        config.settle_delay(),
    );

    let keys = KeySource::spawn().context("Failed to read from the terminal")?;
    let summary = runner.run(&mut session, keys.receiver())?;
    drop(keys);

    if !summary.completed {
        info!("Session incomplete");
    }
    Ok(())
}
