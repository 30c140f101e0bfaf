//! Topic layout: `<prefix>/<root>/<subtopic>`.
//!
//! Inbound control messages arrive under `<prefix>/c`, outbound information
//! is published under `<prefix>/i`.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, TopicError};

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "mopidy";

/// Validated top-level topic prefix.
///
/// Never empty, never contains `+` or `#`, never ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPrefix(String);

impl TopicPrefix {
    pub fn new(prefix: impl AsRef<str>) -> Result<Self, TopicError> {
        let prefix = prefix.as_ref().trim().trim_end_matches('/');
        if prefix.is_empty() {
            return Err(TopicError::EmptyPrefix);
        }
        if prefix.contains(&['+', '#'][..]) {
            return Err(TopicError::Wildcard(prefix.to_string()));
        }
        Ok(Self(prefix.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full topic an information message is published on.
    pub fn info_topic(&self, subtopic: InfoTopic) -> String {
        format!("{}/{}/{}", self.0, Root::Info, subtopic)
    }

    /// Full topic for a control subtopic (what clients publish to).
    pub fn control_topic(&self, subtopic: ControlTopic) -> String {
        format!("{}/{}/{}", self.0, Root::Control, subtopic)
    }

    /// Subscription filter covering every control subtopic.
    pub fn control_filter(&self) -> String {
        format!("{}/{}/+", self.0, Root::Control)
    }

    /// Resolve an inbound topic to its control subtopic.
    ///
    /// The topic must be `<prefix>/c/<subtopic>` with exactly one segment
    /// after the control root.
    pub fn parse_control(&self, topic: &str) -> Result<ControlTopic, DecodeError> {
        let outside = || DecodeError::OutsideControlRoot(topic.to_string());

        let rest = topic
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_prefix(Root::Control.segment()))
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(outside)?;

        if rest.is_empty() || rest.contains('/') {
            return Err(DecodeError::UnknownSubtopic(rest.to_string()));
        }
        rest.parse()
    }
}

impl Default for TopicPrefix {
    fn default() -> Self {
        Self(DEFAULT_PREFIX.to_string())
    }
}

impl fmt::Display for TopicPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed sub-root below the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// `c`: inbound commands
    Control,
    /// `i`: outbound information
    Info,
}

impl Root {
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Control => "c",
            Self::Info => "i",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Inbound subtopics under `<prefix>/c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTopic {
    /// `plb`: playback control
    Playback,
    /// `vol`: absolute or relative volume
    Volume,
    /// `add`: append a URI to the queue
    Add,
    /// `loa`: replace the queue with a playlist
    Load,
    /// `clr`: clear the queue
    Clear,
    /// `src`: library search
    Search,
    /// `inf`: information request
    Info,
}

impl ControlTopic {
    pub const ALL: [ControlTopic; 7] = [
        Self::Playback,
        Self::Volume,
        Self::Add,
        Self::Load,
        Self::Clear,
        Self::Search,
        Self::Info,
    ];

    pub fn segment(&self) -> &'static str {
        match self {
            Self::Playback => "plb",
            Self::Volume => "vol",
            Self::Add => "add",
            Self::Load => "loa",
            Self::Clear => "clr",
            Self::Search => "src",
            Self::Info => "inf",
        }
    }
}

impl FromStr for ControlTopic {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.segment() == s)
            .ok_or_else(|| DecodeError::UnknownSubtopic(s.to_string()))
    }
}

impl fmt::Display for ControlTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Outbound subtopics under `<prefix>/i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoTopic {
    /// `sta`: playback state
    State,
    /// `vol`: volume
    Volume,
    /// `trk`: current track
    Track,
}

impl InfoTopic {
    pub fn segment(&self) -> &'static str {
        match self {
            Self::State => "sta",
            Self::Volume => "vol",
            Self::Track => "trk",
        }
    }
}

impl fmt::Display for InfoTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_validation() {
        assert_eq!(TopicPrefix::new("home/mopidy/").unwrap().as_str(), "home/mopidy");
        assert_eq!(TopicPrefix::new("  "), Err(TopicError::EmptyPrefix));
        assert_eq!(TopicPrefix::new("/"), Err(TopicError::EmptyPrefix));
        assert!(matches!(TopicPrefix::new("a/+/b"), Err(TopicError::Wildcard(_))));
        assert!(matches!(TopicPrefix::new("a/#"), Err(TopicError::Wildcard(_))));
    }

    #[test]
    fn test_topic_formatting() {
        let prefix = TopicPrefix::default();
        assert_eq!(prefix.info_topic(InfoTopic::State), "mopidy/i/sta");
        assert_eq!(prefix.info_topic(InfoTopic::Volume), "mopidy/i/vol");
        assert_eq!(prefix.info_topic(InfoTopic::Track), "mopidy/i/trk");
        assert_eq!(prefix.control_filter(), "mopidy/c/+");
        assert_eq!(prefix.control_topic(ControlTopic::Load), "mopidy/c/loa");
    }

    #[test]
    fn test_parse_control_topics() {
        let prefix = TopicPrefix::new("living/room").unwrap();
        for topic in ControlTopic::ALL {
            let full = prefix.control_topic(topic);
            assert_eq!(prefix.parse_control(&full), Ok(topic));
        }
    }

    #[test]
    fn test_parse_control_rejects_foreign_topics() {
        let prefix = TopicPrefix::default();
        assert!(matches!(
            prefix.parse_control("mopidy/i/vol"),
            Err(DecodeError::OutsideControlRoot(_))
        ));
        assert!(matches!(
            prefix.parse_control("mopidyx/c/vol"),
            Err(DecodeError::OutsideControlRoot(_))
        ));
        assert!(matches!(
            prefix.parse_control("other/c/vol"),
            Err(DecodeError::OutsideControlRoot(_))
        ));
        assert_eq!(
            prefix.parse_control("mopidy/c/xyz"),
            Err(DecodeError::UnknownSubtopic("xyz".to_string()))
        );
        assert!(matches!(
            prefix.parse_control("mopidy/c/vol/extra"),
            Err(DecodeError::UnknownSubtopic(_))
        ));
        assert!(matches!(
            prefix.parse_control("mopidy/c/"),
            Err(DecodeError::UnknownSubtopic(_))
        ));
    }
}
