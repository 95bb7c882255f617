//! Per-window marker mapping.
//!
//! Each display window gets its own marker whose payload names the machine
//! and the window (`"<machine id> - <window name>"`). The marker is generated
//! once and reused; every request flips the window's polarity so consecutive
//! frames alternate between the marker and its negative.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use shared::fifo::ensure_fifo;
use shared::image_size::ImageSize;
use tracing::{debug, warn};

use super::layout::{create_marker, MarkerFrame, MarkerSpec};
use super::MarkerResult;

/// Id reported when no machine id is available.
pub const FALLBACK_ID: &str = "0";

/// Largest id read from the FIFO, in bytes.
const MAX_ID_BYTES: usize = 1023;

/// Source of the machine id embedded in window markers.
pub trait IdSource {
    fn machine_id(&mut self) -> io::Result<String>;
}

/// Fixed machine id.
#[derive(Debug, Clone)]
pub struct StaticIdSource(pub String);

impl IdSource for StaticIdSource {
    fn machine_id(&mut self) -> io::Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads the machine id from a named pipe without blocking.
///
/// The pipe is created when missing. If no writer has put anything into the
/// pipe, the id falls back to [`FALLBACK_ID`].
#[derive(Debug, Clone)]
pub struct FifoIdSource {
    path: PathBuf,
}

impl FifoIdSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdSource for FifoIdSource {
    fn machine_id(&mut self) -> io::Result<String> {
        ensure_fifo(&self.path)?;

        let mut fifo = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)?;

        let mut buffer = vec![0u8; MAX_ID_BYTES];
        let read = match fifo.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e),
        };

        let id = String::from_utf8_lossy(&buffer[..read]).trim().to_string();
        if id.is_empty() {
            debug!("No machine id in {}, using fallback", self.path.display());
            return Ok(FALLBACK_ID.to_string());
        }
        Ok(id)
    }
}

fn window_payload<S: IdSource>(ids: &mut S, window_name: &str) -> String {
    let id = ids.machine_id().unwrap_or_else(|e| {
        warn!("Failed to read machine id: {e}");
        FALLBACK_ID.to_string()
    });
    format!("{id} - {window_name}")
}

#[derive(Debug)]
struct CachedWindow {
    frame: MarkerFrame,
    first_frame: bool,
}

/// Marker frames keyed by window name.
pub struct MarkerCache<S: IdSource> {
    spec: MarkerSpec,
    window_size: ImageSize,
    ids: S,
    windows: HashMap<String, CachedWindow>,
}

impl<S: IdSource> MarkerCache<S> {
    pub fn new(spec: MarkerSpec, window_size: ImageSize, ids: S) -> Self {
        Self {
            spec,
            window_size,
            ids,
            windows: HashMap::new(),
        }
    }

    /// Payload embedded in the marker of `window_name`.
    pub fn payload_for(&mut self, window_name: &str) -> String {
        window_payload(&mut self.ids, window_name)
    }

    /// Marker frame for `window_name`, generating it on first use.
    ///
    /// The returned frame is negative on the first call and alternates on
    /// every call after that.
    pub fn frame_for(&mut self, window_name: &str) -> MarkerResult<MarkerFrame> {
        let entry = match self.windows.entry(window_name.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let payload = window_payload(&mut self.ids, window_name);
                let frame = create_marker(&payload, &self.spec, self.window_size)?;
                debug!(window = window_name, %payload, "Cached new window marker");
                vacant.insert(CachedWindow {
                    frame,
                    first_frame: true,
                })
            }
        };

        let negative = entry.first_frame;
        entry.first_frame = !negative;

        let mut frame = entry.frame.clone();
        frame.negative = negative;
        Ok(frame)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
