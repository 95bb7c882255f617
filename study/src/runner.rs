//! Drives a [`Session`] with real keys, timers and side effects.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use crossbeam_channel::{after, never, select, Receiver};
use rand::Rng;
use tracing::{info, warn};

use crate::display_mode::RefreshRateSetter;
use crate::error::StudyResult;
use crate::fifo::MessageSink;
use crate::session::{Action, Session, SessionEvent};
use crate::trial_log::{TrialLog, TrialRecord};

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ratings: usize,
    pub total_trials: usize,
    /// False when the participant aborted or the key source went away
    pub completed: bool,
}

pub struct StudyRunner<S: MessageSink, D: RefreshRateSetter> {
    participant: String,
    sink: S,
    rates: D,
    log: TrialLog,
    trial_timeout: Duration,
    settle_delay: Duration,
}

impl<S: MessageSink, D: RefreshRateSetter> StudyRunner<S, D> {
    pub fn new(
        participant: impl Into<String>,
        sink: S,
        rates: D,
        log: TrialLog,
        trial_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            participant: participant.into(),
            sink,
            rates,
            log,
            trial_timeout,
            settle_delay,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn rates(&self) -> &D {
        &self.rates
    }

    pub fn log(&self) -> &TrialLog {
        &self.log
    }

    /// Run `session` until it finishes, reading keys from `keys`.
    pub fn run<R: Rng>(
        &mut self,
        session: &mut Session<R>,
        keys: &Receiver<char>,
    ) -> StudyResult<RunSummary> {
        let mut timer: Option<(u64, Receiver<Instant>)> = None;
        let mut completed = false;

        info!("Press {} to start", crate::session::START_KEY);

        while !session.is_finished() {
            let timer_rx = timer
                .as_ref()
                .map(|(_, rx)| rx.clone())
                .unwrap_or_else(never);

            let event = select! {
                recv(keys) -> key => key.ok().map(SessionEvent::Key),
                recv(timer_rx) -> _ => timer.take().map(|(seq, _)| SessionEvent::Timeout(seq)),
            };
            let Some(event) = event else {
                warn!("Key input closed, ending session");
                break;
            };

            for action in session.handle(event) {
                if let Some(done) = self.execute(action, &mut timer)? {
                    completed = done;
                }
            }
        }

        let summary = RunSummary {
            ratings: session.ratings(),
            total_trials: session.total_trials(),
            completed,
        };
        info!(
            "Session ended: {}/{} ratings logged to {}",
            summary.ratings,
            summary.total_trials,
            self.log.path().display()
        );
        Ok(summary)
    }

    /// Carry out one action; returns `Some(completed)` for [`Action::Finish`].
    fn execute(
        &mut self,
        action: Action,
        timer: &mut Option<(u64, Receiver<Instant>)>,
    ) -> StudyResult<Option<bool>> {
        match action {
            Action::SetRefreshRate(rate) => {
                // The display keeps its previous rate on failure
                if let Err(e) = self.rates.set_rate(rate) {
                    warn!("Refresh rate switch to {rate} Hz failed: {e}");
                }
                thread::sleep(self.settle_delay);
            }
            Action::SendMessage(message) => self.sink.send(&message)?,
            Action::StartTimer(seq) => *timer = Some((seq, after(self.trial_timeout))),
            Action::LogRating { condition, rating } => {
                let record = TrialRecord::new(&self.participant, &condition, rating, Local::now());
                self.log.append(&record)?;
                info!("Rating {rating} for {condition}");
            }
            Action::Finish { completed } => {
                *timer = None;
                return Ok(Some(completed));
            }
        }
        Ok(None)
    }
}
