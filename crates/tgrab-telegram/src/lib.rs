//! Telegram adapter for the archiver core, built on grammers (MTProto).
//!
//! The Bot API cannot enumerate a group's history, so this adapter signs in
//! as a regular user account, the same way the desktop clients do.

pub mod client;
pub mod fetcher;
pub mod source;

pub use fetcher::TelegramMediaFetcher;
pub use source::TelegramMessageSource;
