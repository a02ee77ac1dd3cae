//! Text codec for exo-sync peer datagrams.
//!
//! Wire format: one UTF-8 message per datagram.  The keyword is the text
//! before the first `,` (control) or whitespace (everything else) and is
//! matched case-insensitively.  Numeric fields accept `,` as the decimal
//! separator (`12,5` is `12.5`).
//!
//! Decoding never panics.  Anything that is not a well-formed message yields
//! a [`ProtocolError`], which receivers treat as "unrecognized" and drop.

use crate::protocol::messages::{
    BorderCommand, ControlMessage, PeerMessage, KEYWORD_BORDER, KEYWORD_CONTROL, KEYWORD_LOG,
    KEYWORD_MASTER, KEYWORD_REPEAT, KEYWORD_SEQUENCE,
};
use thiserror::Error;

/// Reasons a datagram is unrecognized, or a message cannot be put on the wire.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The datagram is not valid UTF-8.
    #[error("datagram is not valid UTF-8")]
    InvalidUtf8,

    /// The datagram does not start with a known keyword.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// The keyword is known but its fields are missing or unparseable.
    #[error("malformed {command} message: {reason}")]
    Malformed {
        command: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    fn malformed(command: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::Malformed {
            command,
            reason: reason.into(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one datagram into a [`PeerMessage`].
///
/// # Errors
///
/// Returns [`ProtocolError`] for anything that is not a well-formed message.
///
/// # Examples
///
/// ```rust
/// use exo_core::protocol::{decode_message, PeerMessage};
///
/// let msg = decode_message(b"MASTER true").unwrap();
/// assert_eq!(msg, PeerMessage::SetMaster { enabled: true });
/// assert!(decode_message(b"hello").is_err());
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<PeerMessage, ProtocolError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ProtocolError::InvalidUtf8)?
        .trim();

    let keyword_end = text
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(text.len());
    let keyword = text[..keyword_end].to_ascii_lowercase();

    match keyword.as_str() {
        KEYWORD_CONTROL => decode_control(text),
        KEYWORD_REPEAT => {
            let enabled = single_bool_argument(text, KEYWORD_REPEAT)?;
            Ok(PeerMessage::Repeat { enabled })
        }
        KEYWORD_MASTER => {
            let enabled = single_bool_argument(text, KEYWORD_MASTER)?;
            Ok(PeerMessage::SetMaster { enabled })
        }
        KEYWORD_BORDER => decode_border(text).map(PeerMessage::SetBorder),
        KEYWORD_LOG => decode_log(text),
        KEYWORD_SEQUENCE => Ok(PeerMessage::SequenceMarker {
            raw_text: text.to_string(),
        }),
        _ => Err(ProtocolError::UnknownCommand(keyword)),
    }
}

/// Encodes a [`PeerMessage`] into its canonical datagram text.
///
/// Floats are written with Rust's shortest round-trip representation and a
/// `.` decimal separator.  A [`PeerMessage::SequenceMarker`] is written as its
/// raw text.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the message could not be decoded
/// back by a peer: a non-finite angle, a control timestamp that is empty or
/// contains `,`, or a log name that is not a plain file-name stem.
///
/// # Examples
///
/// ```rust
/// use exo_core::protocol::{encode_message, PeerMessage, BorderCommand};
///
/// let bytes = encode_message(&PeerMessage::SetBorder(BorderCommand::Upper(12.5))).unwrap();
/// assert_eq!(bytes, b"border upper 12.5");
/// ```
pub fn encode_message(msg: &PeerMessage) -> Result<Vec<u8>, ProtocolError> {
    let text = match msg {
        PeerMessage::Control(c) => encode_control(c)?,
        PeerMessage::Repeat { enabled } => format!("{KEYWORD_REPEAT} {enabled}"),
        PeerMessage::SetMaster { enabled } => format!("{KEYWORD_MASTER} {enabled}"),
        PeerMessage::SetBorder(cmd) => encode_border(cmd)?,
        PeerMessage::SwitchLog { name } => {
            validate_log_name(name)?;
            format!("{KEYWORD_LOG} {name}")
        }
        PeerMessage::SequenceMarker { raw_text } => raw_text.clone(),
    };
    Ok(text.into_bytes())
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

fn decode_control(text: &str) -> Result<PeerMessage, ProtocolError> {
    let fields: Vec<&str> = text.split(',').collect();
    if !fields[0].trim().eq_ignore_ascii_case(KEYWORD_CONTROL) {
        return Err(ProtocolError::malformed(
            KEYWORD_CONTROL,
            "keyword must be followed by ','",
        ));
    }

    // With `,` doubling as the decimal separator, six fields means both angles
    // were written as `<int>,<frac>`.
    let (elbow, wrist, timestamp) = match fields.len() {
        4 => (
            parse_number(fields[1], KEYWORD_CONTROL)?,
            parse_number(fields[2], KEYWORD_CONTROL)?,
            fields[3],
        ),
        6 => (
            parse_split_decimal(fields[1], fields[2])?,
            parse_split_decimal(fields[3], fields[4])?,
            fields[5],
        ),
        n => {
            return Err(ProtocolError::malformed(
                KEYWORD_CONTROL,
                format!("expected elbow, wrist and timestamp, got {} field(s)", n - 1),
            ))
        }
    };

    let timestamp = timestamp.trim();
    if timestamp.is_empty() {
        return Err(ProtocolError::malformed(KEYWORD_CONTROL, "empty timestamp"));
    }

    Ok(PeerMessage::Control(ControlMessage {
        elbow,
        wrist,
        timestamp: timestamp.to_string(),
    }))
}

fn decode_border(text: &str) -> Result<BorderCommand, ProtocolError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some(sub) = tokens.get(1) else {
        return Err(ProtocolError::malformed(KEYWORD_BORDER, "missing argument"));
    };

    match sub.to_ascii_lowercase().as_str() {
        "upper" | "lower" => {
            if tokens.len() != 3 {
                return Err(ProtocolError::malformed(
                    KEYWORD_BORDER,
                    format!("`border {sub}` takes exactly one value"),
                ));
            }
            let value = parse_number(tokens[2], KEYWORD_BORDER)?;
            if sub.eq_ignore_ascii_case("upper") {
                Ok(BorderCommand::Upper(value))
            } else {
                Ok(BorderCommand::Lower(value))
            }
        }
        "true" | "false" if tokens.len() == 2 => {
            if sub.eq_ignore_ascii_case("true") {
                Ok(BorderCommand::Enable)
            } else {
                Ok(BorderCommand::Disable)
            }
        }
        _ => Err(ProtocolError::malformed(
            KEYWORD_BORDER,
            format!("unexpected arguments: {:?}", &tokens[1..]),
        )),
    }
}

fn decode_log(text: &str) -> Result<PeerMessage, ProtocolError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(ProtocolError::malformed(
            KEYWORD_LOG,
            "expected exactly one name",
        ));
    }
    let name = tokens[1].to_lowercase();
    validate_log_name(&name)?;
    Ok(PeerMessage::SwitchLog { name })
}

fn single_bool_argument(text: &str, command: &'static str) -> Result<bool, ProtocolError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(ProtocolError::malformed(command, "expected `true` or `false`"));
    }
    parse_bool(tokens[1], command)
}

fn parse_bool(token: &str, command: &'static str) -> Result<bool, ProtocolError> {
    if token.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if token.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ProtocolError::malformed(
            command,
            format!("expected `true` or `false`, got {token:?}"),
        ))
    }
}

/// Parses a finite float, normalising `,` to `.` first.
fn parse_number(field: &str, command: &'static str) -> Result<f64, ProtocolError> {
    let normalized = field.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ProtocolError::malformed(
            command,
            format!("not a number: {field:?}"),
        )),
    }
}

/// Re-joins `<int>` and `<frac>` fields split by a `,` decimal separator.
fn parse_split_decimal(int_part: &str, frac_part: &str) -> Result<f64, ProtocolError> {
    let frac_part = frac_part.trim();
    if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::malformed(
            KEYWORD_CONTROL,
            format!("not a decimal fraction: {frac_part:?}"),
        ));
    }
    parse_number(&format!("{}.{}", int_part.trim(), frac_part), KEYWORD_CONTROL)
}

/// Log names become file-name stems, so path syntax is refused.
fn validate_log_name(name: &str) -> Result<(), ProtocolError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(ProtocolError::malformed(
            KEYWORD_LOG,
            format!("invalid log name: {name:?}"),
        ))
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

fn encode_control(c: &ControlMessage) -> Result<String, ProtocolError> {
    require_finite(c.elbow, KEYWORD_CONTROL)?;
    require_finite(c.wrist, KEYWORD_CONTROL)?;
    if c.timestamp.is_empty() || c.timestamp.contains(',') {
        return Err(ProtocolError::malformed(
            KEYWORD_CONTROL,
            format!("timestamp cannot be sent: {:?}", c.timestamp),
        ));
    }
    Ok(format!(
        "{KEYWORD_CONTROL},{:?},{:?},{}",
        c.elbow, c.wrist, c.timestamp
    ))
}

fn encode_border(cmd: &BorderCommand) -> Result<String, ProtocolError> {
    Ok(match cmd {
        BorderCommand::Upper(v) => {
            require_finite(*v, KEYWORD_BORDER)?;
            format!("{KEYWORD_BORDER} upper {v:?}")
        }
        BorderCommand::Lower(v) => {
            require_finite(*v, KEYWORD_BORDER)?;
            format!("{KEYWORD_BORDER} lower {v:?}")
        }
        BorderCommand::Enable => format!("{KEYWORD_BORDER} true"),
        BorderCommand::Disable => format!("{KEYWORD_BORDER} false"),
    })
}

fn require_finite(v: f64, command: &'static str) -> Result<(), ProtocolError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::malformed(command, format!("non-finite value {v}")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
