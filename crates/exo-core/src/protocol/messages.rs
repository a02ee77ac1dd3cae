//! All exo-sync peer message types.
//!
//! One message travels per UDP datagram as UTF-8 text.  The vocabulary is
//! closed:
//!
//! | Keyword    | Grammar                                          |
//! |------------|--------------------------------------------------|
//! | `control`  | `control,<elbow>,<wrist>,<timestamp>`            |
//! | `repeat`   | `repeat <true\|false>`                           |
//! | `master`   | `master <true\|false>`                           |
//! | `border`   | `border upper <v>` / `border lower <v>` / `border <true\|false>` |
//! | `log`      | `log <name>`                                     |
//! | `sequence` | `sequence <anything>`                            |

use chrono::{DateTime, Local};

use crate::domain::pose::JointPose;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Receive buffer size; every message fits in one datagram of this size.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

pub const KEYWORD_CONTROL: &str = "control";
pub const KEYWORD_REPEAT: &str = "repeat";
pub const KEYWORD_MASTER: &str = "master";
pub const KEYWORD_BORDER: &str = "border";
pub const KEYWORD_LOG: &str = "log";
pub const KEYWORD_SEQUENCE: &str = "sequence";

/// `chrono` format of the timestamp carried in control messages and session
/// log records, e.g. `14:03:27.118204`.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.6f";

/// Formats a wall-clock instant the way control messages carry it.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time formatted with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

// ── Payload structs ───────────────────────────────────────────────────────────

/// A motion target published by the master.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub elbow: f64,
    pub wrist: f64,
    /// Sender wall-clock time, opaque to the receiver.
    pub timestamp: String,
}

impl ControlMessage {
    pub fn pose(&self) -> JointPose {
        JointPose::new(self.elbow, self.wrist)
    }
}

/// The four forms of the `border` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BorderCommand {
    Upper(f64),
    Lower(f64),
    Enable,
    Disable,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// A decoded peer datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    Control(ControlMessage),
    /// `repeat false` stops position holding by releasing every actuator.
    Repeat { enabled: bool },
    SetMaster { enabled: bool },
    SetBorder(BorderCommand),
    /// Switches the session log to a new file derived from `name`.
    SwitchLog { name: String },
    /// The full datagram text, appended verbatim to the session log.
    SequenceMarker { raw_text: String },
}

impl PeerMessage {
    /// Wire keyword for this variant.
    pub fn keyword(&self) -> &'static str {
        match self {
            PeerMessage::Control(_) => KEYWORD_CONTROL,
            PeerMessage::Repeat { .. } => KEYWORD_REPEAT,
            PeerMessage::SetMaster { .. } => KEYWORD_MASTER,
            PeerMessage::SetBorder(_) => KEYWORD_BORDER,
            PeerMessage::SwitchLog { .. } => KEYWORD_LOG,
            PeerMessage::SequenceMarker { .. } => KEYWORD_SEQUENCE,
        }
    }

    /// Builds the control message a master publishes for `pose`.
    pub fn control(pose: JointPose, timestamp: impl Into<String>) -> Self {
        PeerMessage::Control(ControlMessage {
            elbow: pose.elbow,
            wrist: pose.wrist,
            timestamp: timestamp.into(),
        })
    }
}
