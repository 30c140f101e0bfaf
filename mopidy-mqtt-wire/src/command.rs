//! Inbound control commands.
//!
//! | Subtopic | Payload | Command |
//! |---|---|---|
//! | `plb` | `play` `stop` `pause` `resume` `toggle` `prev` `next` | playback action |
//! | `vol` | `=N` | [`ControlCommand::SetVolume`] |
//! | `vol` | `+N` `-N` | [`ControlCommand::AdjustVolume`] |
//! | `add` | URI | [`ControlCommand::Enqueue`] |
//! | `loa` | URI | [`ControlCommand::LoadPlaylist`] |
//! | `clr` | ignored | [`ControlCommand::ClearQueue`] |
//! | `src` | query | [`ControlCommand::Search`] |
//! | `inf` | `state` `volume` `queue` | [`ControlCommand::InfoRequest`] |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::model::Volume;
use crate::topic::ControlTopic;

/// A decoded control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum ControlCommand {
    Play,
    Stop,
    Pause,
    Resume,
    Toggle,
    Previous,
    Next,
    /// Absolute volume, already clamped into range
    SetVolume(Volume),
    /// Signed volume delta
    AdjustVolume(i32),
    Enqueue(String),
    LoadPlaylist(String),
    ClearQueue,
    Search(String),
    InfoRequest(InfoKind),
}

impl ControlCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Toggle => "toggle",
            Self::Previous => "previous",
            Self::Next => "next",
            Self::SetVolume(_) => "set_volume",
            Self::AdjustVolume(_) => "adjust_volume",
            Self::Enqueue(_) => "enqueue",
            Self::LoadPlaylist(_) => "load_playlist",
            Self::ClearQueue => "clear_queue",
            Self::Search(_) => "search",
            Self::InfoRequest(_) => "info_request",
        }
    }
}

/// What an `inf` request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoKind {
    State,
    Volume,
    Queue,
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => write!(f, "state"),
            Self::Volume => write!(f, "volume"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

/// Decode a payload received on a control subtopic.
pub fn decode(topic: ControlTopic, payload: &[u8]) -> Result<ControlCommand, DecodeError> {
    // `clr` accepts any payload, including non-UTF-8 bytes.
    if topic == ControlTopic::Clear {
        return Ok(ControlCommand::ClearQueue);
    }

    let payload = std::str::from_utf8(payload)
        .map_err(|_| DecodeError::InvalidUtf8)?
        .trim();

    match topic {
        ControlTopic::Playback => decode_playback(payload),
        ControlTopic::Volume => decode_volume(payload),
        ControlTopic::Add => non_empty(topic, payload).map(ControlCommand::Enqueue),
        ControlTopic::Load => non_empty(topic, payload).map(ControlCommand::LoadPlaylist),
        ControlTopic::Clear => Ok(ControlCommand::ClearQueue),
        ControlTopic::Search => non_empty(topic, payload).map(ControlCommand::Search),
        ControlTopic::Info => decode_info(payload),
    }
}

fn decode_playback(payload: &str) -> Result<ControlCommand, DecodeError> {
    Ok(match payload {
        "play" => ControlCommand::Play,
        "stop" => ControlCommand::Stop,
        "pause" => ControlCommand::Pause,
        "resume" => ControlCommand::Resume,
        "toggle" => ControlCommand::Toggle,
        "prev" => ControlCommand::Previous,
        "next" => ControlCommand::Next,
        other => {
            return Err(DecodeError::UnknownLiteral {
                subtopic: ControlTopic::Playback.segment(),
                value: other.to_string(),
            })
        }
    })
}

fn decode_volume(payload: &str) -> Result<ControlCommand, DecodeError> {
    let invalid = || DecodeError::InvalidVolume(payload.to_string());

    let mut chars = payload.chars();
    let operator = chars.next().ok_or_else(invalid)?;
    let amount = chars.as_str();

    match operator {
        '=' => {
            // An absolute level may carry its own sign; "=-5" clamps to 0.
            let (negative, digits) = match amount.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, amount.strip_prefix('+').unwrap_or(amount)),
            };
            if !is_digits(digits) {
                return Err(invalid());
            }
            // Anything too long for i64 is still far outside the range.
            let value = match digits.parse::<i64>() {
                Ok(value) if negative => -value,
                Ok(value) => value,
                Err(_) if negative => i64::MIN,
                Err(_) => i64::MAX,
            };
            Ok(ControlCommand::SetVolume(Volume::clamped(value)))
        }
        '+' | '-' => {
            // Digits only: "+-5" is malformed, not a double sign.
            if !is_digits(amount) {
                return Err(invalid());
            }
            // Deltas beyond the full range behave the same as the full range.
            let magnitude = amount.parse::<i32>().unwrap_or(i32::MAX);
            let delta = if operator == '-' { -magnitude } else { magnitude };
            Ok(ControlCommand::AdjustVolume(delta))
        }
        _ => Err(invalid()),
    }
}

fn is_digits(amount: &str) -> bool {
    !amount.is_empty() && amount.bytes().all(|b| b.is_ascii_digit())
}

fn decode_info(payload: &str) -> Result<ControlCommand, DecodeError> {
    let kind = match payload {
        "state" => InfoKind::State,
        "volume" => InfoKind::Volume,
        "queue" => InfoKind::Queue,
        other => {
            return Err(DecodeError::UnknownLiteral {
                subtopic: ControlTopic::Info.segment(),
                value: other.to_string(),
            })
        }
    };
    Ok(ControlCommand::InfoRequest(kind))
}

fn non_empty(topic: ControlTopic, payload: &str) -> Result<String, DecodeError> {
    if payload.is_empty() {
        Err(DecodeError::EmptyPayload(topic.segment()))
    } else {
        Ok(payload.to_string())
    }
}
