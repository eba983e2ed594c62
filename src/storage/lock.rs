//! Advisory whole-file locks via `flock(2)`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::warn;

/// Holds an exclusive `flock` on a file until dropped.
pub struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Blocks until the exclusive lock is acquired.
    pub fn exclusive(file: &'a File) -> io::Result<Self> {
        loop {
            // SAFETY: the descriptor is owned by `file`, which outlives the guard.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                return Ok(Self { file });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // SAFETY: see `exclusive`. Closing the file would release the lock anyway.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

/// Creates the parent directories of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Appends one buffer to `path` under an exclusive lock.
///
/// `render` receives the file length observed while holding the lock, so a
/// writer can add a header exactly once. If the file does not end with a
/// newline, the buffer is moved onto a fresh line. The buffer goes out in a
/// single `write_all`; a write that fails partway is truncated away.
pub fn append_locked<R>(path: &Path, render: R) -> io::Result<()>
where
    R: FnOnce(u64) -> Vec<u8>,
{
    let file = OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(path)?;
    let _lock = FileLock::exclusive(&file)?;
    let len = file.metadata()?.len();

    let mut bytes = render(len);
    if !bytes.is_empty() && !ends_with_newline(&file, len)? {
        bytes.insert(0, b'\n');
    }

    let mut writer = &file;
    write_or_rollback(&file, len, &mut writer, &bytes)
}

fn ends_with_newline(file: &File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.read_exact_at(&mut last, len - 1)?;
    Ok(last[0] == b'\n')
}

/// Writes `bytes`, cutting `file` back to `len` if the write fails.
fn write_or_rollback<W: Write>(file: &File, len: u64, out: &mut W, bytes: &[u8]) -> io::Result<()> {
    let result = out.write_all(bytes).and_then(|_| out.flush());
    if result.is_err()
        && let Err(e) = file.set_len(len)
    {
        warn!("Could not remove partial write: {}", e);
    }
    result
}
