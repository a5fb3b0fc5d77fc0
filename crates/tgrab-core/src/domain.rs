use std::{path::PathBuf, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Error;

/// Telegram message id (numeric, monotonically increasing within a chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub i32);

/// Media attached to a message, reduced to what the archiver cares about.
///
/// The source's message model guarantees at most one attachment kind per
/// message, so no tie-breaking is ever needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaAttachment {
    Photo,
    Document {
        mime_type: Option<String>,
        file_name: Option<String>,
    },
    LinkPreviewPhoto,
}

/// One message from the conversation history, as yielded by the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveMessage {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    pub media: Option<MediaAttachment>,
}

/// How the operator names the conversation to archive.
///
/// All three forms resolve through the same source lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
    InviteLink(String),
}

impl FromStr for ChatTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Config(
                "conversation identifier is empty".to_string(),
            ));
        }
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChatTarget::Id(id));
        }
        if s.contains("t.me/joinchat/") || s.contains("t.me/+") {
            return Ok(ChatTarget::InviteLink(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix('@') {
            return Ok(ChatTarget::Username(rest.to_string()));
        }
        // Plain t.me profile links carry a username as the last segment.
        if let Some(idx) = s.find("t.me/") {
            let name = s[idx + "t.me/".len()..]
                .trim_end_matches('/')
                .to_string();
            if !name.is_empty() {
                return Ok(ChatTarget::Username(name));
            }
        }
        Ok(ChatTarget::Username(s.to_string()))
    }
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{id}"),
            ChatTarget::Username(name) => write!(f, "@{name}"),
            ChatTarget::InviteLink(link) => write!(f, "{link}"),
        }
    }
}

/// Resolved conversation handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
}

/// One per-item download failure, kept for the summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    pub message_id: MessageId,
    pub reason: String,
}

/// Run-level accounting. Owned by the driver for the lifetime of one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub errored: usize,
    pub output_dir: PathBuf,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DownloadFailure>,
}

impl RunSummary {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_numeric_id() {
        let t: ChatTarget = "-1001234567890".parse().unwrap();
        assert_eq!(t, ChatTarget::Id(-1001234567890));
    }

    #[test]
    fn target_parses_username_forms() {
        for s in ["archive_group", "@archive_group", "https://t.me/archive_group"] {
            let t: ChatTarget = s.parse().unwrap();
            assert_eq!(t, ChatTarget::Username("archive_group".to_string()), "{s}");
        }
    }

    #[test]
    fn target_parses_invite_links() {
        for s in [
            "https://t.me/joinchat/AbCdEf123",
            "https://t.me/+AbCdEf123",
        ] {
            let t: ChatTarget = s.parse().unwrap();
            assert_eq!(t, ChatTarget::InviteLink(s.to_string()));
        }
    }

    #[test]
    fn target_rejects_empty() {
        assert!("   ".parse::<ChatTarget>().is_err());
    }
}
