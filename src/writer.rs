use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::RotationPolicy;

/// How the primary log file is opened at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileMode {
    /// Truncate: each run starts a fresh primary file.
    #[default]
    #[serde(rename = "w")]
    Write,
    /// Append to whatever the file already holds.
    #[serde(rename = "a")]
    Append,
}

/// State of the current log file.
#[derive(Debug)]
struct FileState {
    file: File,
    size: u64,
}

/// A log file writer that rotates by size.
///
/// Every call to [`RotatingWriter::write_record`] holds one lock for the
/// rotation check, the rename chain and the write, so records from
/// concurrent callers never interleave.
#[derive(Debug)]
pub struct RotatingWriter {
    path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<Option<FileState>>,
    truncate_pending: AtomicBool,
}

impl RotatingWriter {
    /// Open `path` according to `mode`, creating parent directories.
    pub fn new(path: &Path, policy: RotationPolicy, mode: FileMode) -> io::Result<Self> {
        let writer = Self::prepare(path, policy, mode)?;
        writer.start()?;
        Ok(writer)
    }

    /// Open `path` without touching its content yet.
    ///
    /// In [`FileMode::Write`] the file keeps its previous content until
    /// [`RotatingWriter::start`] truncates it.
    pub fn prepare(path: &Path, policy: RotationPolicy, mode: FileMode) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let state = open(path, FileMode::Append)?;

        Ok(Self {
            path: path.to_path_buf(),
            policy,
            state: Mutex::new(Some(state)),
            truncate_pending: AtomicBool::new(mode == FileMode::Write),
        })
    }

    /// Truncate the file if it was prepared in [`FileMode::Write`].
    /// Only the first call has an effect.
    pub fn start(&self) -> io::Result<()> {
        let mut guard = self.lock();
        if !self.truncate_pending.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        match guard.as_mut() {
            Some(state) => {
                state.file.set_len(0)?;
                state.size = 0;
            }
            None => *guard = Some(open(&self.path, FileMode::Write)?),
        }
        Ok(())
    }

    /// Path of the primary log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotation settings.
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Option<FileState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one complete record, rotating first if it would overflow the file.
    pub fn write_record(&self, buf: &[u8]) -> io::Result<()> {
        let mut guard = self.lock();

        let current = guard.as_ref().map(|s| s.size).unwrap_or(0);
        if self.policy.should_rotate(current, buf.len()) {
            // Close before renaming.
            *guard = None;
            self.policy.rotate(&self.path)?;
            *guard = Some(open(&self.path, FileMode::Write)?);
        } else if guard.is_none() {
            // A previous rotation failed half way; pick the file up again.
            *guard = Some(open(&self.path, FileMode::Append)?);
        }

        let Some(state) = guard.as_mut() else {
            return Err(io::Error::other("log file is not open"));
        };
        state.file.write_all(buf)?;
        state.size += buf.len() as u64;
        Ok(())
    }

    /// Flush the current file.
    pub fn flush_file(&self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(state) => state.file.flush(),
            None => Ok(()),
        }
    }
}

fn open(path: &Path, mode: FileMode) -> io::Result<FileState> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        FileMode::Write => options.write(true).truncate(true),
        FileMode::Append => options.append(true),
    };
    let file = options.open(path)?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok(FileState { file, size })
}
