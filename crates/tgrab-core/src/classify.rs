//! Media classification: decides whether a message carries a downloadable
//! image and, if so, which output name it gets.

use chrono::{DateTime, Utc};

use crate::domain::{ArchiveMessage, MediaAttachment};

/// Which kind of image a message carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    DocumentImage,
    LinkPreview,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::DocumentImage => "document",
            MediaKind::LinkPreview => "webpreview",
        }
    }
}

/// Outcome of classifying one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// A downloadable image with its output file name (no directory part).
    Image { kind: MediaKind, file_name: String },
    /// A document attachment that is not an image; counted as skipped.
    NonImageDocument,
    /// No attachment worth considering; no counter changes.
    NoMedia,
}

/// Pure decision function. No I/O, no hidden state; recomputed per message.
pub fn classify(message: &ArchiveMessage) -> Classification {
    let id = message.id.0;
    match &message.media {
        Some(MediaAttachment::Photo) => Classification::Image {
            kind: MediaKind::Photo,
            // Telegram photos are always JPEG-compatible.
            file_name: format!("photo_{}_{id}.jpg", date_slug(&message.date)),
        },

        Some(MediaAttachment::Document {
            mime_type,
            file_name,
        }) => {
            let is_image = mime_type
                .as_deref()
                .map(|m| m.starts_with("image/"))
                .unwrap_or(false);
            if !is_image {
                return Classification::NonImageDocument;
            }

            let name = match file_name.as_deref() {
                // Prefix with the message id so two documents declaring the
                // same name never resolve to the same output path.
                Some(declared) => format!("{id}_{}", sanitize_filename(declared)),
                None => format!(
                    "document_{}_{id}{}",
                    date_slug(&message.date),
                    extension_for_mime(mime_type.as_deref().unwrap_or(""))
                ),
            };
            Classification::Image {
                kind: MediaKind::DocumentImage,
                file_name: name,
            }
        }

        Some(MediaAttachment::LinkPreviewPhoto) => Classification::Image {
            kind: MediaKind::LinkPreview,
            file_name: format!("webpreview_{}_{id}.jpg", date_slug(&message.date)),
        },

        None => Classification::NoMedia,
    }
}

fn date_slug(date: &DateTime<Utc>) -> String {
    date.format("%Y%m%d_%H%M%S").to_string()
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/svg+xml" => ".svg",
        "image/heic" => ".heic",
        "image/avif" => ".avif",
        _ => ".jpg",
    }
}

pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "document".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use chrono::TimeZone;

    fn msg(id: i32, media: Option<MediaAttachment>) -> ArchiveMessage {
        ArchiveMessage {
            id: MessageId(id),
            date: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap(),
            media,
        }
    }

    fn image_doc(mime: &str, name: Option<&str>) -> Option<MediaAttachment> {
        Some(MediaAttachment::Document {
            mime_type: Some(mime.to_string()),
            file_name: name.map(|s| s.to_string()),
        })
    }

    #[test]
    fn photo_names_carry_id_and_jpg_extension() {
        let c = classify(&msg(42, Some(MediaAttachment::Photo)));
        match c {
            Classification::Image { kind, file_name } => {
                assert_eq!(kind, MediaKind::Photo);
                assert_eq!(file_name, "photo_20240309_143005_42.jpg");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn non_image_document_is_a_skip() {
        let c = classify(&msg(7, image_doc("application/pdf", Some("report.pdf"))));
        assert_eq!(c, Classification::NonImageDocument);
    }

    #[test]
    fn document_without_mime_is_a_skip() {
        let c = classify(&msg(
            7,
            Some(MediaAttachment::Document {
                mime_type: None,
                file_name: Some("mystery.bin".to_string()),
            }),
        ));
        assert_eq!(c, Classification::NonImageDocument);
    }

    #[test]
    fn image_document_without_name_derives_extension_from_mime() {
        let c = classify(&msg(9, image_doc("image/png", None)));
        match c {
            Classification::Image { kind, file_name } => {
                assert_eq!(kind, MediaKind::DocumentImage);
                assert_eq!(file_name, "document_20240309_143005_9.png");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn unknown_image_mime_falls_back_to_jpg() {
        let c = classify(&msg(9, image_doc("image/x-strange", None)));
        match c {
            Classification::Image { file_name, .. } => {
                assert!(file_name.ends_with(".jpg"), "{file_name}");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn declared_name_is_sanitized_and_prefixed_with_id() {
        let c = classify(&msg(15, image_doc("image/jpeg", Some("my photo (1).jpg"))));
        match c {
            Classification::Image { file_name, .. } => {
                assert_eq!(file_name, "15_my_photo__1_.jpg");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn link_preview_photo_gets_webpreview_name() {
        let c = classify(&msg(100, Some(MediaAttachment::LinkPreviewPhoto)));
        match c {
            Classification::Image { kind, file_name } => {
                assert_eq!(kind, MediaKind::LinkPreview);
                assert_eq!(file_name, "webpreview_20240309_143005_100.jpg");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn no_attachment_classifies_as_no_media() {
        assert_eq!(classify(&msg(1, None)), Classification::NoMedia);
    }

    #[test]
    fn classification_is_idempotent() {
        let m = msg(42, image_doc("image/webp", None));
        assert_eq!(classify(&m), classify(&m));
    }

    #[test]
    fn sanitize_replaces_disallowed_chars() {
        assert_eq!(sanitize_filename("a/b\\c d.png"), "a_b_c_d.png");
        assert_eq!(sanitize_filename(""), "document");
    }
}
