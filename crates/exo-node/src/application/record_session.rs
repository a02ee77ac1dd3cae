//! Session log port.
//!
//! A session log is a plain-text record of a trial: one
//! `timestamp,value_elbow,value_wrist` line per publisher tick, the raw text of
//! every `sequence` marker, and short notes when the role or the boundary
//! changes.  The file handling lives in the infrastructure layer; this module
//! only defines what the application needs from it.
//!
//! Logging is optional.  A recorder that is not active must accept every call
//! and do no I/O.

use std::path::PathBuf;

use exo_core::{JointPose, Role};
use thiserror::Error;

/// Error type for session log operations.
#[derive(Debug, Error)]
pub enum SessionLogError {
    /// The log directory or a log file could not be created or written.
    #[error("I/O error on session log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Header line written at the top of every session log file.
pub const SESSION_LOG_HEADER: &str = "timestamp,value_elbow,value_wrist";

/// Destination for session records.
pub trait SessionRecorder: Send + Sync {
    /// `true` when records are actually being written somewhere.
    fn is_active(&self) -> bool;

    /// Appends one pose sample.
    fn record_pose(&self, timestamp: &str, pose: JointPose) -> Result<(), SessionLogError>;

    /// Appends the raw text of a `sequence` message.
    fn record_marker(&self, text: &str) -> Result<(), SessionLogError>;

    /// Appends a free-form note (role or boundary change).
    fn note(&self, text: &str) -> Result<(), SessionLogError>;

    /// Closes the current destination and opens a new one derived from
    /// `name` and the node's current `role`.
    fn switch_destination(&self, name: &str, role: Role) -> Result<(), SessionLogError>;
}

/// Formats one pose sample the way it appears in a session log.
pub fn format_pose_record(timestamp: &str, pose: JointPose) -> String {
    format!("{timestamp},{},{}", pose.elbow, pose.wrist)
}
