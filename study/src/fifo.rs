//! Hand-off of display messages through a named pipe.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StudyError, StudyResult};
use crate::messages::DisplayMessage;

/// Destination for display messages.
pub trait MessageSink {
    fn send(&mut self, message: &DisplayMessage) -> StudyResult<()>;
}

/// Writes each message to a FIFO, one open/write/close per message.
///
/// Opening blocks until the display process has the pipe open for reading.
/// A missing pipe is not an error: the message is dropped with a warning.
#[derive(Debug, Clone)]
pub struct FifoSink {
    path: PathBuf,
}

impl FifoSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the pipe if it does not exist yet.
    pub fn ensure_fifo(&self) -> StudyResult<bool> {
        shared::fifo::ensure_fifo(&self.path).map_err(|source| StudyError::Fifo {
            path: self.path.clone(),
            source,
        })
    }
}

impl MessageSink for FifoSink {
    fn send(&mut self, message: &DisplayMessage) -> StudyResult<()> {
        let mut fifo = match OpenOptions::new().write(true).open(&self.path) {
            Ok(fifo) => fifo,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("FIFO not found: {}", self.path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(StudyError::Fifo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        fifo.write_all(message.render().as_bytes())
            .map_err(|source| StudyError::Fifo {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            marker = %message.marker,
            scenario = %message.scenario,
            framerate = message.framerate,
            timeout = message.timeout,
            "Sent display message"
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub messages: Vec<DisplayMessage>,
}

impl MessageSink for RecordingSink {
    fn send(&mut self, message: &DisplayMessage) -> StudyResult<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}

impl<T: MessageSink + ?Sized> MessageSink for Box<T> {
    fn send(&mut self, message: &DisplayMessage) -> StudyResult<()> {
        (**self).send(message)
    }
}
