//! Codec errors.

use thiserror::Error;

/// Invalid topic prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic prefix is empty")]
    EmptyPrefix,

    #[error("topic prefix {0:?} contains an MQTT wildcard")]
    Wildcard(String),
}

/// An inbound message that produces no command.
///
/// These never leave the dispatcher; they are logged and the message dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("topic {0:?} is not under the control root")]
    OutsideControlRoot(String),

    #[error("unknown control subtopic {0:?}")]
    UnknownSubtopic(String),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("unknown {subtopic} value {value:?}")]
    UnknownLiteral {
        subtopic: &'static str,
        value: String,
    },

    #[error("invalid volume payload {0:?}")]
    InvalidVolume(String),

    #[error("empty {0} payload")]
    EmptyPayload(&'static str),
}
