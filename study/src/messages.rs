//! Messages for the external display process.
//!
//! One message per FIFO write, as `key:value` lines in a fixed order. Booleans
//! are spelled `True`/`False`, which is what the display process parses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::conditions::Condition;

/// Scenario name that tells the display process the study is over.
pub const FINISHED_SCENARIO: &str = "fin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub marker: String,
    pub scenario: String,
    pub framerate: u32,
    /// The trial's viewing time has run out and the rating prompt is shown
    pub timeout: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseMessageError {
    #[error("Line '{0}' is not a key:value pair")]
    MalformedLine(String),

    #[error("Missing key '{0}'")]
    MissingKey(&'static str),

    #[error("Invalid value '{value}' for key '{key}'")]
    InvalidValue { key: &'static str, value: String },
}

impl DisplayMessage {
    pub fn new(condition: &Condition, timeout: bool) -> Self {
        Self {
            marker: condition.marker.clone(),
            scenario: condition.scenario.clone(),
            framerate: condition.framerate,
            timeout,
        }
    }

    /// End-of-study message, sent with the last condition's marker and rate.
    pub fn finished(condition: &Condition) -> Self {
        Self {
            scenario: FINISHED_SCENARIO.to_string(),
            ..Self::new(condition, false)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.scenario == FINISHED_SCENARIO
    }

    /// Wire form of the message.
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn parse(s: &str) -> Result<Self, ParseMessageError> {
        s.parse()
    }
}

impl fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "marker:{}\nscenarios:{}\nframerate:{}\ntimeout:{}",
            self.marker,
            self.scenario,
            self.framerate,
            if self.timeout { "True" } else { "False" }
        )
    }
}

impl FromStr for DisplayMessage {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut marker = None;
        let mut scenario = None;
        let mut framerate = None;
        let mut timeout = None;

        for line in s.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ParseMessageError::MalformedLine(line.to_string()))?;
            match key {
                "marker" => marker = Some(value.to_string()),
                "scenarios" => scenario = Some(value.to_string()),
                "framerate" => {
                    framerate = Some(value.parse::<u32>().map_err(|_| {
                        ParseMessageError::InvalidValue {
                            key: "framerate",
                            value: value.to_string(),
                        }
                    })?)
                }
                "timeout" => {
                    timeout = Some(match value {
                        "True" => true,
                        "False" => false,
                        _ => {
                            return Err(ParseMessageError::InvalidValue {
                                key: "timeout",
                                value: value.to_string(),
                            })
                        }
                    })
                }
                _ => tracing::debug!("Ignoring unknown message key '{key}'"),
            }
        }

        Ok(Self {
            marker: marker.ok_or(ParseMessageError::MissingKey("marker"))?,
            scenario: scenario.ok_or(ParseMessageError::MissingKey("scenarios"))?,
            framerate: framerate.ok_or(ParseMessageError::MissingKey("framerate"))?,
            timeout: timeout.ok_or(ParseMessageError::MissingKey("timeout"))?,
        })
    }
}
