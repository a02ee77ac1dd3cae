//! File-backed session log.
//!
//! Layout of a log directory after a typical trial:
//!
//! ```text
//! <dir>/initial_01.03_14:03.log          opened at startup
//! <dir>/reach_host_01.03_14:05.log       after `log reach` while master
//! <dir>/reach_follower_01.03_14:05.log   same message, on the follower
//! ```
//!
//! Every file starts with [`SESSION_LOG_HEADER`].  Each write is flushed
//! immediately so a crash loses at most the record being written.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use exo_core::{JointPose, Role};
use tracing::{debug, info};

use crate::application::record_session::{
    format_pose_record, SessionLogError, SessionRecorder, SESSION_LOG_HEADER,
};

/// strftime pattern of the time suffix in log file names.
const FILE_TIME_FORMAT: &str = "%d.%m_%H:%M";

struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFile {
    fn create(path: PathBuf) -> Result<Self, SessionLogError> {
        let file = File::create(&path).map_err(|source| SessionLogError::Io {
            path: path.clone(),
            source,
        })?;
        let mut log = Self {
            path,
            writer: BufWriter::new(file),
        };
        log.write_line(SESSION_LOG_HEADER)?;
        info!("session log: {}", log.path.display());
        Ok(log)
    }

    fn write_line(&mut self, line: &str) -> Result<(), SessionLogError> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|source| SessionLogError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

struct ActiveLog {
    dir: PathBuf,
    /// `None` after a switch whose new file could not be created.
    current: Option<LogFile>,
}

/// Session log that is either writing into a directory or disabled.
pub struct SessionLog {
    active: Option<Mutex<ActiveLog>>,
}

impl SessionLog {
    /// A log that accepts every call and touches no files.
    pub fn disabled() -> Self {
        Self { active: None }
    }

    /// Creates `dir` if needed and opens `initial_<time>.log` inside it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionLogError::Io`] if the directory or file cannot be
    /// created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionLogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SessionLogError::Io {
            path: dir.clone(),
            source,
        })?;
        let initial = LogFile::create(dir.join(log_file_name("initial", &Local::now())))?;
        Ok(Self {
            active: Some(Mutex::new(ActiveLog {
                dir,
                current: Some(initial),
            })),
        })
    }

    /// Path of the file currently being written, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        let log = self.lock()?;
        log.current.as_ref().map(|f| f.path.clone())
    }

    fn lock(&self) -> Option<MutexGuard<'_, ActiveLog>> {
        self.active
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_line(&self, line: &str) -> Result<(), SessionLogError> {
        match self.lock() {
            Some(mut log) => match log.current.as_mut() {
                Some(file) => file.write_line(line),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}

impl SessionRecorder for SessionLog {
    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn record_pose(&self, timestamp: &str, pose: JointPose) -> Result<(), SessionLogError> {
        self.write_line(&format_pose_record(timestamp, pose))
    }

    fn record_marker(&self, text: &str) -> Result<(), SessionLogError> {
        self.write_line(text)
    }

    fn note(&self, text: &str) -> Result<(), SessionLogError> {
        self.write_line(text)
    }

    fn switch_destination(&self, name: &str, role: Role) -> Result<(), SessionLogError> {
        let Some(mut log) = self.lock() else {
            return Ok(());
        };
        if let Some(old) = log.current.take() {
            debug!("closing session log {}", old.path.display());
        }
        let prefix = format!("{name}_{}", role.log_tag());
        let path = log.dir.join(log_file_name(&prefix, &Local::now()));
        log.current = Some(LogFile::create(path)?);
        Ok(())
    }
}

/// `<prefix>_<dd.mm_HH:MM>.log`
pub fn log_file_name(prefix: &str, at: &DateTime<Local>) -> String {
    format!("{prefix}_{}.log", at.format(FILE_TIME_FORMAT))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
