//! Display refresh-rate switching.

use std::process::Command;

use tracing::info;

use crate::error::{StudyError, StudyResult};

pub trait RefreshRateSetter {
    fn set_rate(&mut self, rate: u32) -> StudyResult<()>;
}

impl<T: RefreshRateSetter + ?Sized> RefreshRateSetter for Box<T> {
    fn set_rate(&mut self, rate: u32) -> StudyResult<()> {
        (**self).set_rate(rate)
    }
}

/// Switches the refresh rate of one output with `xrandr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xrandr {
    pub output: String,
    pub mode: String,
    /// Executable to run, `xrandr` unless overridden
    pub program: String,
}

impl Default for Xrandr {
    fn default() -> Self {
        Self {
            output: "DP-4".to_string(),
            mode: "1920x1080".to_string(),
            program: "xrandr".to_string(),
        }
    }
}

impl Xrandr {
    pub fn new(output: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            mode: mode.into(),
            program: "xrandr".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command line arguments for switching to `rate` Hz.
    pub fn args(&self, rate: u32) -> Vec<String> {
        vec![
            "--output".to_string(),
            self.output.clone(),
            "--mode".to_string(),
            self.mode.clone(),
            "--rate".to_string(),
            rate.to_string(),
        ]
    }
}

impl RefreshRateSetter for Xrandr {
    fn set_rate(&mut self, rate: u32) -> StudyResult<()> {
        info!("Switching {} to {} @ {rate} Hz", self.output, self.mode);
        let status = Command::new(&self.program)
            .args(self.args(rate))
            .status()
            .map_err(StudyError::Xrandr)?;
        if !status.success() {
            return Err(StudyError::RateSwitch { rate, status });
        }
        Ok(())
    }
}

/// Only logs the requested rate; for dry runs without a display.
#[derive(Debug, Default, Clone)]
pub struct NoopRateSetter;

impl RefreshRateSetter for NoopRateSetter {
    fn set_rate(&mut self, rate: u32) -> StudyResult<()> {
        info!("Refresh rate switching disabled, would switch to {rate} Hz");
        Ok(())
    }
}
