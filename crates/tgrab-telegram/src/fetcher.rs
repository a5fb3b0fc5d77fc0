//! Media fetcher backed by grammers downloads.

use std::path::Path;

use async_trait::async_trait;

use tgrab_core::{domain::ArchiveMessage, ports::MediaFetcher, Error, Result};

use crate::source::StagedMessage;

/// Downloads the staged raw message's media via MTProto.
pub struct TelegramMediaFetcher {
    staged: StagedMessage,
}

impl TelegramMediaFetcher {
    pub(crate) fn new(staged: StagedMessage) -> Self {
        Self { staged }
    }
}

#[async_trait]
impl MediaFetcher for TelegramMediaFetcher {
    async fn download(&self, message: &ArchiveMessage, dest: &Path) -> Result<()> {
        let guard = self.staged.lock().await;
        let raw = guard
            .as_ref()
            .filter(|m| m.raw.id == message.id.0)
            .ok_or_else(|| {
                Error::Fetch(format!(
                    "message {} is no longer staged for download",
                    message.id.0
                ))
            })?;

        raw.download_media(dest)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(())
    }
}
