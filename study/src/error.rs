use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::trial_log::TrialLogError;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("FIFO error on {path}: {source}")]
    Fifo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Log(#[from] TrialLogError),

    #[error("Failed to run xrandr: {0}")]
    Xrandr(#[source] io::Error),

    #[error("xrandr exited with {status} while switching to {rate} Hz")]
    RateSwitch { rate: u32, status: ExitStatus },

    #[error("Invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StudyResult<T> = Result<T, StudyError>;
