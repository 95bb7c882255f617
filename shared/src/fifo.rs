//! Named pipe helpers.
//!
//! Both the study runner and the marker id lookup talk to other processes
//! through FIFOs on the local filesystem.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// Permissions used for pipes created by the study tools.
pub const FIFO_MODE: libc::mode_t = 0o777;

/// Whether `path` exists and is a named pipe.
pub fn is_fifo(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

/// Create a named pipe at `path`.
pub fn create_fifo(path: &Path) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Create the pipe unless something already exists at `path`.
///
/// Returns `Ok(true)` when a new pipe was created.
pub fn ensure_fifo(path: &Path) -> io::Result<bool> {
    if path.exists() {
        if !is_fifo(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists but is not a FIFO", path.display()),
            ));
        }
        return Ok(false);
    }
    create_fifo(path)?;
    Ok(true)
}
