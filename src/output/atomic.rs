//! Atomic file replacement.
//!
//! Artifacts are written to a temporary file in the destination directory,
//! flushed to disk, then renamed over the destination. A reader never sees a
//! half-written report or cache, and a crash leaves the previous version in
//! place.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `path` atomically using the provided writer callback.
///
/// The parent directory is created if needed.
///
/// # Errors
///
/// Returns the first I/O error from creating the temp file, the callback,
/// flushing, syncing or the final rename. On error the destination is left
/// unchanged and the temp file is removed.
pub fn write_atomic<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = BufWriter::new(temp);
    write(&mut writer)?;
    writer.flush()?;

    let temp = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    log::trace!("Wrote {}", path.display());
    Ok(())
}

/// Atomically replace `path` with `bytes`.
///
/// # Errors
///
/// See [`write_atomic`].
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic(path, |w| w.write_all(bytes))
}
