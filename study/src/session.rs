//! Trial state machine.
//!
//! The session never touches the outside world. Key presses and timer
//! expiries go in as [`SessionEvent`]s; what has to happen comes back out as a
//! list of [`Action`]s for the runner to carry out in order.
//!
//! ```text
//! WaitingToStart --'5'--> Showing --timeout--> AwaitingRating --'1'..'5'--> Showing ...
//!                                                             \--(last)--> Finished
//! ```

use rand::Rng;
use tracing::{debug, info};

use crate::conditions::Condition;
use crate::messages::DisplayMessage;
use crate::schedule::{Schedule, Step};

/// Key that starts the session.
pub const START_KEY: char = '5';

pub const ESCAPE: char = '\u{1b}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Key(char),
    /// The viewing timer of trial `seq` ran out
    Timeout(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetRefreshRate(u32),
    SendMessage(DisplayMessage),
    /// Start the viewing timer for trial `seq`
    StartTimer(u64),
    LogRating { condition: Condition, rating: u8 },
    /// `completed` is false when the participant aborted
    Finish { completed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    WaitingToStart,
    Showing { step: Step, seq: u64 },
    AwaitingRating { step: Step },
    Finished,
}

pub struct Session<R: Rng> {
    schedule: Schedule<R>,
    state: SessionState,
    seq: u64,
    last_condition: Option<Condition>,
    ratings: usize,
}

fn rating(key: char) -> Option<u8> {
    match key {
        '1'..='5' => key.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}

fn is_abort(key: char) -> bool {
    matches!(key, 'q' | 'Q' | ESCAPE)
}

impl<R: Rng> Session<R> {
    pub fn new(schedule: Schedule<R>) -> Self {
        Self {
            schedule,
            state: SessionState::WaitingToStart,
            seq: 0,
            last_condition: None,
            ratings: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Ratings given so far.
    pub fn ratings(&self) -> usize {
        self.ratings
    }

    pub fn total_trials(&self) -> usize {
        self.schedule.total_trials()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        if self.is_finished() {
            return Vec::new();
        }

        if let SessionEvent::Key(key) = event {
            if is_abort(key) {
                info!("Session aborted after {} ratings", self.ratings);
                self.state = SessionState::Finished;
                return vec![Action::Finish { completed: false }];
            }
        }

        match (&self.state, event) {
            (SessionState::WaitingToStart, SessionEvent::Key(START_KEY)) => {
                info!("Session started, {} trials", self.schedule.total_trials());
                self.next_trial()
            }
            (SessionState::Showing { step, seq }, SessionEvent::Timeout(expired))
                if *seq == expired =>
            {
                let message = DisplayMessage::new(&step.condition, true);
                self.state = SessionState::AwaitingRating { step: step.clone() };
                vec![Action::SendMessage(message)]
            }
            (SessionState::AwaitingRating { step }, SessionEvent::Key(key)) => {
                match rating(key) {
                    Some(rating) => {
                        let condition = step.condition.clone();
                        self.ratings += 1;
                        let mut actions = vec![Action::LogRating { condition, rating }];
                        actions.extend(self.next_trial());
                        actions
                    }
                    None => {
                        debug!("Ignoring key {key:?} while waiting for a rating");
                        Vec::new()
                    }
                }
            }
            (_, SessionEvent::Timeout(expired)) => {
                debug!("Ignoring stale timeout of trial {expired}");
                Vec::new()
            }
            (state, SessionEvent::Key(key)) => {
                debug!("Ignoring key {key:?} in state {state:?}");
                Vec::new()
            }
        }
    }

    fn next_trial(&mut self) -> Vec<Action> {
        let Some(step) = self.schedule.next() else {
            self.state = SessionState::Finished;
            let mut actions = Vec::new();
            if let Some(condition) = &self.last_condition {
                actions.push(Action::SendMessage(DisplayMessage::finished(condition)));
            }
            actions.push(Action::Finish { completed: true });
            return actions;
        };

        self.seq += 1;
        info!(
            trial = step.trial + 1,
            pass = step.pass + 1,
            "Showing {}",
            step.condition
        );

        let mut actions = Vec::with_capacity(3);
        if let Some(rate) = step.switch_rate {
            actions.push(Action::SetRefreshRate(rate));
        }
        actions.push(Action::SendMessage(DisplayMessage::new(
            &step.condition,
            false,
        )));
        actions.push(Action::StartTimer(self.seq));

        self.last_condition = Some(step.condition.clone());
        self.state = SessionState::Showing {
            step,
            seq: self.seq,
        };
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionLists;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session(passes: usize) -> Session<ChaCha8Rng> {
        let lists = ConditionLists {
            framerates: vec![60, 240],
            markers: vec!["qr".to_string(), "aruco".to_string()],
            scenarios: vec!["image".to_string()],
        };
        Session::new(Schedule::new(lists, passes, ChaCha8Rng::seed_from_u64(9)))
    }

    fn started(passes: usize) -> Session<ChaCha8Rng> {
        let mut s = session(passes);
        s.handle(SessionEvent::Key('5'));
        s
    }

    #[test]
    fn test_waits_for_start_key() {
        let mut s = session(1);
        assert!(s.handle(SessionEvent::Key('1')).is_empty());
        assert!(s.handle(SessionEvent::Timeout(1)).is_empty());
        assert_eq!(s.state(), &SessionState::WaitingToStart);

        let actions = s.handle(SessionEvent::Key('5'));
        assert!(matches!(actions[0], Action::SetRefreshRate(_)));
        assert!(matches!(&actions[1], Action::SendMessage(m) if !m.timeout));
        assert_eq!(actions[2], Action::StartTimer(1));
    }

    #[test]
    fn test_rating_only_after_timeout() {
        let mut s = started(1);
        assert!(s.handle(SessionEvent::Key('3')).is_empty());

        let actions = s.handle(SessionEvent::Timeout(1));
        assert!(matches!(&actions[..], [Action::SendMessage(m)] if m.timeout));

        let actions = s.handle(SessionEvent::Key('3'));
        assert!(matches!(&actions[0], Action::LogRating { rating: 3, .. }));
        assert!(actions.contains(&Action::StartTimer(2)));
        assert_eq!(s.ratings(), 1);
    }

    #[test]
    fn test_stale_timeout_ignored() {
        let mut s = started(1);
        s.handle(SessionEvent::Timeout(1));
        s.handle(SessionEvent::Key('2'));

        // Trial 2 is showing; the timer of trial 1 must not end it
        assert!(s.handle(SessionEvent::Timeout(1)).is_empty());
        assert!(matches!(s.state(), SessionState::Showing { seq: 2, .. }));
    }

    #[test]
    fn test_invalid_rating_keys_ignored() {
        let mut s = started(1);
        s.handle(SessionEvent::Timeout(1));
        for key in ['0', '6', '9', 'x'] {
            assert!(s.handle(SessionEvent::Key(key)).is_empty());
        }
        assert!(matches!(s.state(), SessionState::AwaitingRating { .. }));
    }

    #[test]
    fn test_full_session_ends_with_fin_message() {
        let mut s = started(2);
        let mut logged = 0;
        let mut last = Vec::new();
        for seq in 1..=8 {
            s.handle(SessionEvent::Timeout(seq));
            last = s.handle(SessionEvent::Key('4'));
            logged += last
                .iter()
                .filter(|a| matches!(a, Action::LogRating { .. }))
                .count();
        }

        assert_eq!(logged, 8);
        assert!(s.is_finished());
        assert!(matches!(&last[1], Action::SendMessage(m) if m.is_finished()));
        assert_eq!(last[2], Action::Finish { completed: true });
        assert!(s.handle(SessionEvent::Key('5')).is_empty());
    }

    #[test]
    fn test_abort_at_any_time() {
        let mut s = session(1);
        assert_eq!(
            s.handle(SessionEvent::Key('q')),
            vec![Action::Finish { completed: false }]
        );
        assert!(s.is_finished());

        let mut s = started(1);
        assert_eq!(
            s.handle(SessionEvent::Key(ESCAPE)),
            vec![Action::Finish { completed: false }]
        );
    }

    #[test]
    fn test_rate_switch_actions_follow_schedule() {
        let mut s = started(1);
        let mut switches = 1;
        for seq in 1..4 {
            s.handle(SessionEvent::Timeout(seq));
            let actions = s.handle(SessionEvent::Key('1'));
            switches += actions
                .iter()
                .filter(|a| matches!(a, Action::SetRefreshRate(_)))
                .count();
        }
        // Two framerates, one switch each
        assert_eq!(switches, 2);
    }
}
