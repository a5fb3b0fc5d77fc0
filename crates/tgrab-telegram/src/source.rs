//! Message history source backed by grammers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use grammers_client::{
    types::{Chat, Message},
    Client,
};
use grammers_tl_types as tl;
use tokio::sync::{mpsc, Mutex};

use tgrab_core::{
    domain::{ArchiveMessage, ChatTarget, Conversation, MediaAttachment, MessageId},
    ports::MessageSource,
    Error, Result,
};

/// Most recently yielded raw message, staged for the fetcher.
///
/// A single slot is enough: the driver processes messages strictly
/// sequentially, so the fetch for message N always happens before message
/// N+1 is pulled.
pub(crate) type StagedMessage = Arc<Mutex<Option<Message>>>;

const CHANNEL_CAPACITY: usize = 32;

/// Implements [`MessageSource`] over a signed-in grammers [`Client`].
///
/// Iteration runs in a producer task feeding a small bounded channel, so
/// history pagination overlaps with downloads without reordering anything.
pub struct TelegramMessageSource {
    client: Client,
    limit: Option<usize>,
    staged: StagedMessage,
    rx: Option<mpsc::Receiver<Result<(ArchiveMessage, Message)>>>,
}

impl TelegramMessageSource {
    pub fn new(client: Client, limit: Option<usize>) -> Self {
        Self {
            client,
            limit,
            staged: Arc::new(Mutex::new(None)),
            rx: None,
        }
    }

    /// A fetcher sharing this source's staging slot.
    pub fn fetcher(&self) -> crate::fetcher::TelegramMediaFetcher {
        crate::fetcher::TelegramMediaFetcher::new(self.staged.clone())
    }

    async fn resolve_chat(&self, target: &ChatTarget) -> Result<Chat> {
        match target {
            ChatTarget::Username(name) => self
                .client
                .resolve_username(name)
                .await
                .map_err(external)?
                .ok_or_else(|| Error::Lookup {
                    target: target.to_string(),
                    reason: "username does not exist".to_string(),
                }),

            ChatTarget::Id(id) => self.find_dialog(*id).await,

            ChatTarget::InviteLink(link) => {
                let hash = invite_hash(link).ok_or_else(|| Error::Lookup {
                    target: target.to_string(),
                    reason: "not a recognizable invite link".to_string(),
                })?;
                let invite = self
                    .client
                    .invoke(&tl::functions::messages::CheckChatInvite {
                        hash: hash.to_string(),
                    })
                    .await
                    .map_err(external)?;
                match invite {
                    tl::enums::ChatInvite::Already(already) => {
                        self.find_dialog(tl_chat_id(&already.chat)).await
                    }
                    _ => Err(Error::Lookup {
                        target: target.to_string(),
                        reason: "the account has not joined this invite link".to_string(),
                    }),
                }
            }
        }
    }

    async fn find_dialog(&self, wanted: i64) -> Result<Chat> {
        let mut dialogs = self.client.iter_dialogs();
        loop {
            match dialogs.next().await {
                Ok(Some(dialog)) => {
                    let chat = dialog.chat();
                    if chat_id_matches(chat.id(), wanted) {
                        return Ok(chat.clone());
                    }
                }
                Ok(None) => {
                    return Err(Error::Lookup {
                        target: wanted.to_string(),
                        reason: "no dialog with this id; the account must be a member"
                            .to_string(),
                    })
                }
                Err(e) => return Err(external(e)),
            }
        }
    }
}

#[async_trait]
impl MessageSource for TelegramMessageSource {
    async fn resolve(&mut self, target: &ChatTarget) -> Result<Conversation> {
        let chat = self.resolve_chat(target).await?;
        let conversation = Conversation {
            id: chat.id(),
            title: chat.name().to_string(),
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let client = self.client.clone();
        let limit = self.limit;
        tokio::spawn(async move {
            let mut iter = client.iter_messages(&chat);
            if let Some(n) = limit {
                iter = iter.limit(n);
            }
            loop {
                match iter.next().await {
                    Ok(Some(message)) => {
                        let item = map_message(&message);
                        // A closed receiver means the run is over.
                        if tx.send(Ok((item, message))).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(Error::Source(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        self.rx = Some(rx);
        Ok(conversation)
    }

    async fn next_message(
        &mut self,
        _conversation: &Conversation,
    ) -> Result<Option<ArchiveMessage>> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(Error::Source(
                "message source used before resolve".to_string(),
            ));
        };
        match rx.recv().await {
            Some(Ok((item, raw))) => {
                *self.staged.lock().await = Some(raw);
                Ok(Some(item))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

fn map_message(message: &Message) -> ArchiveMessage {
    let raw = &message.raw;
    ArchiveMessage {
        id: MessageId(raw.id),
        date: message_date(raw.date),
        media: raw.media.as_ref().and_then(map_media),
    }
}

fn message_date(stamp: i32) -> DateTime<Utc> {
    Utc.timestamp_opt(i64::from(stamp), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn map_media(media: &tl::enums::MessageMedia) -> Option<MediaAttachment> {
    match media {
        tl::enums::MessageMedia::Photo(m) if m.photo.is_some() => Some(MediaAttachment::Photo),

        tl::enums::MessageMedia::Document(m) => match m.document.as_ref()? {
            tl::enums::Document::Document(doc) => Some(MediaAttachment::Document {
                mime_type: non_empty(&doc.mime_type),
                file_name: doc.attributes.iter().find_map(|attr| match attr {
                    tl::enums::DocumentAttribute::Filename(f) => Some(f.file_name.clone()),
                    _ => None,
                }),
            }),
            _ => None,
        },

        // Link previews only matter when the page actually embeds a photo.
        tl::enums::MessageMedia::WebPage(m) => match &m.webpage {
            tl::enums::WebPage::Page(page) if page.photo.is_some() => {
                Some(MediaAttachment::LinkPreviewPhoto)
            }
            _ => None,
        },

        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Telegram surfaces the same chat id in several spellings: the raw id, the
/// classic negative group id, and the Bot-API style `-100`-prefixed form.
fn chat_id_matches(raw: i64, wanted: i64) -> bool {
    if raw == wanted {
        return true;
    }
    if wanted < 0 {
        let positive = -wanted;
        if raw == positive {
            return true;
        }
        let stripped = positive - 1_000_000_000_000;
        if stripped > 0 && raw == stripped {
            return true;
        }
    }
    false
}

fn tl_chat_id(chat: &tl::enums::Chat) -> i64 {
    match chat {
        tl::enums::Chat::Empty(c) => c.id,
        tl::enums::Chat::Chat(c) => c.id,
        tl::enums::Chat::Forbidden(c) => c.id,
        tl::enums::Chat::Channel(c) => c.id,
        tl::enums::Chat::ChannelForbidden(c) => c.id,
    }
}

fn external(err: impl std::fmt::Display) -> Error {
    Error::External(err.to_string())
}

fn invite_hash(link: &str) -> Option<&str> {
    let idx = link.find("t.me/")?;
    let rest = &link[idx + "t.me/".len()..];
    let rest = rest.split(['?', '#']).next()?;
    let rest = rest.trim_end_matches('/');
    let hash = rest
        .strip_prefix("joinchat/")
        .or_else(|| rest.strip_prefix('+'))?;
    if hash.is_empty() {
        None
    } else {
        Some(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_matches_all_spellings() {
        assert!(chat_id_matches(1234567890, 1234567890));
        assert!(chat_id_matches(12345, -12345));
        assert!(chat_id_matches(1234567890, -1001234567890));
        assert!(!chat_id_matches(999, -1001234567890));
    }

    #[test]
    fn invite_hash_handles_both_link_forms() {
        assert_eq!(
            invite_hash("https://t.me/joinchat/AbCdEf123"),
            Some("AbCdEf123")
        );
        assert_eq!(invite_hash("https://t.me/+AbCdEf123"), Some("AbCdEf123"));
        assert_eq!(invite_hash("https://t.me/+AbCdEf123/"), Some("AbCdEf123"));
        assert_eq!(invite_hash("https://t.me/+AbCdEf123?start=1"), Some("AbCdEf123"));
        assert_eq!(invite_hash("https://t.me/some_group"), None);
        assert_eq!(invite_hash("not a link"), None);
    }
}
