use std::path::Path;

use async_trait::async_trait;

use crate::{domain::*, Result};

/// Hexagonal port for the message history backend (Telegram, fakes in tests).
///
/// Iteration is lazy and forward-only, in whatever order the backing service
/// yields messages; the driver makes no ordering assumption.
#[async_trait]
pub trait MessageSource: Send {
    /// Resolve the target conversation.
    ///
    /// Fails with [`crate::Error::Lookup`] when the identifier cannot be
    /// resolved; that failure is fatal and happens before any message is
    /// processed.
    async fn resolve(&mut self, target: &ChatTarget) -> Result<Conversation>;

    /// Next message of the conversation, `None` once the history is
    /// exhausted. A mid-stream error aborts the run.
    async fn next_message(&mut self, conversation: &Conversation)
        -> Result<Option<ArchiveMessage>>;
}

/// Hexagonal port for persisting one message's media to disk.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the media attached to `message` into `dest`.
    ///
    /// Any failure here (network, write, unsupported media) is isolated to
    /// this item; the driver counts it and moves on.
    async fn download(&self, message: &ArchiveMessage, dest: &Path) -> Result<()>;
}
