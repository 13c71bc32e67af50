//! Media Locator: finds attachment entries in the backup buffer and
//! classifies their binary content by signature.
//!
//! Runs independently of the note scanner over the full buffer. Entries
//! whose payload matches no known signature are omitted from the mapping
//! with a diagnostic; that is policy, not an error, since the format is
//! reverse-engineered.

use crate::api::Message;
use crate::model::MediaKind;
use crate::scan::find_bytes;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::collections::BTreeMap;

// Tar-style header: `miui_att/<40 hex id>[.ext]`.
static ATTACHMENT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)miui_att/([a-f0-9]{40})(\.[a-z0-9]+)?").unwrap());

// Audio payloads start somewhere past the tar-style header area.
const AUDIO_HEADER_SKIP: usize = 100;
// A trailing NUL run longer than this is archive padding, not audio data.
const AUDIO_NULL_RUN: usize = 50;

/// Content classification by leading-byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Mp3,
}

impl MediaFormat {
    /// Classifies a payload by its leading bytes; `None` means the
    /// signature is unknown and the entry should be left unextracted.
    pub fn classify(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xff, 0xd8]) {
            Some(MediaFormat::Jpeg)
        } else if data.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
            Some(MediaFormat::Png)
        } else if data.starts_with(b"ID3") {
            Some(MediaFormat::Mp3)
        } else if data.len() >= 2 && data[0] == 0xff && data[1] & 0xe0 == 0xe0 {
            // Bare MPEG sync pair.
            Some(MediaFormat::Mp3)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Mp3 => "mp3",
        }
    }

    pub fn kind(self) -> MediaKind {
        match self {
            MediaFormat::Jpeg | MediaFormat::Png => MediaKind::Image,
            MediaFormat::Mp3 => MediaKind::Audio,
        }
    }
}

/// One extracted attachment, keyed by id in the outcome mapping.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub format: MediaFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MediaOutcome {
    pub attachments: BTreeMap<String, Attachment>,
    pub messages: Vec<Message>,
}

/// Scans the full buffer for attachment entries and returns the id-keyed
/// mapping of those whose content could be classified.
pub fn locate(data: &[u8]) -> MediaOutcome {
    let mut outcome = MediaOutcome::default();
    let entries: Vec<(String, usize)> = ATTACHMENT_HEADER
        .captures_iter(data)
        .map(|caps| {
            let id = String::from_utf8_lossy(&caps[1]).into_owned();
            (id, caps.get(0).unwrap().start())
        })
        .collect();

    for (i, (id, start)) in entries.iter().enumerate() {
        // Search region runs from this header to the next (or EOF).
        let end = entries.get(i + 1).map(|e| e.1).unwrap_or(data.len());
        let region = &data[*start..end];
        let located = entry_payload(region)
            .and_then(|payload| MediaFormat::classify(&payload).map(|format| (format, payload)));
        let Some((format, payload)) = located else {
            outcome.messages.push(Message::warning(format!(
                "Attachment {}: no recognizable content signature, leaving placeholder",
                id
            )));
            continue;
        };
        // Duplicate ids keep the first located payload.
        outcome.attachments.entry(id.clone()).or_insert_with(|| Attachment {
            id: id.clone(),
            format,
            data: payload,
        });
    }
    outcome
}

fn entry_payload(region: &[u8]) -> Option<Vec<u8>> {
    // JPEG: signature through the end-of-image marker.
    if let Some(start) = find_bytes(region, &[0xff, 0xd8, 0xff]) {
        if let Some(end) = find_bytes(&region[start..], &[0xff, 0xd9]) {
            return Some(region[start..start + end + 2].to_vec());
        }
    }
    // PNG: signature through IEND plus its CRC. A region truncated
    // inside the trailer has no complete payload to extract.
    if let Some(start) = find_bytes(region, b"\x89PNG\r\n\x1a\n") {
        if let Some(end) = find_bytes(&region[start..], b"IEND") {
            return region.get(start..start + end + 8).map(|p| p.to_vec());
        }
    }
    // MPEG audio: ID3 tag or sync pair past the header area.
    let audio = region.get(AUDIO_HEADER_SKIP..)?;
    let id3 = find_bytes(audio, b"ID3");
    let sync = audio
        .windows(2)
        .position(|w| w[0] == 0xff && w[1] & 0xe0 == 0xe0);
    let start = match (id3, sync) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }?;
    Some(trim_null_padding(&audio[start..]).to_vec())
}

fn trim_null_padding(data: &[u8]) -> &[u8] {
    let tail_nulls = data.iter().rev().take_while(|b| **b == 0).count();
    if tail_nulls > AUDIO_NULL_RUN {
        &data[..data.len() - tail_nulls]
    } else {
        data
    }
}
