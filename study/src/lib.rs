//! Runner for the marker visibility study.
//!
//! Participants see every combination of marker, scenario and refresh rate in
//! shuffled order, several passes over. Each trial is announced to the
//! display process through a FIFO, shown for a fixed time and then rated on a
//! 1 to 5 scale; ratings are appended to a CSV log.

pub mod conditions;
pub mod config;
pub mod display_mode;
pub mod error;
pub mod fifo;
pub mod input;
pub mod messages;
pub mod runner;
pub mod schedule;
pub mod session;
pub mod trial_log;

pub use conditions::{Condition, ConditionLists};
pub use config::StudyConfig;
pub use error::{StudyError, StudyResult};
pub use messages::DisplayMessage;
pub use runner::{RunSummary, StudyRunner};
pub use schedule::{Schedule, Step};
pub use session::{Action, Session, SessionEvent, SessionState};
