//! Conversion facade: the single entry point for turning a backup buffer
//! into notes and attachments.
//!
//! The facade wires the scanner, decoder, renderer and media locator
//! together and applies the caller-facing toggles. It returns structured
//! data and diagnostics; it never prints and never exits. Each record's
//! decode-and-render step is independent of every other record, and the
//! result order follows buffer order.

use crate::error::Result;
use crate::markdown;
use crate::markup;
use crate::media::{self, Attachment};
use crate::model::Note;
use crate::scan::{self, BoundaryStrategy};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A diagnostic produced somewhere in the pipeline. The CLI layer decides
/// how to present these.
#[derive(Debug, Clone)]
pub struct Message {
    pub level: MessageLevel,
    pub content: String,
}

impl Message {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// The two independent CLI toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Keep records recovered by the field-tag fallback (deleted notes
    /// from backup history).
    pub include_deleted: bool,
    /// Run the media locator and populate the attachment mapping.
    pub extract_media: bool,
}

/// Structured outcome of one conversion run.
#[derive(Debug, Default)]
pub struct Conversion {
    pub notes: Vec<Note>,
    pub attachments: BTreeMap<String, Attachment>,
    pub messages: Vec<Message>,
    pub recovered: usize,
    pub skipped: usize,
}

/// Converts a backup buffer into notes and (optionally) attachments.
///
/// Fatal only when the notes section is missing; everything else degrades
/// per record and surfaces as diagnostics on the result.
pub fn convert(data: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    // 1. Segment the notes section into raw records.
    let outcome = scan::scan(data)?;
    let mut conversion = Conversion {
        skipped: outcome.skipped,
        messages: outcome.messages,
        ..Default::default()
    };

    // 2. Post-scan filter: field-tag records are historical salvage.
    let records = outcome
        .records
        .into_iter()
        .filter(|r| options.include_deleted || r.origin == BoundaryStrategy::FolderMarker);

    // 3. The backup holds repeated snapshots of the same note; the first
    // occurrence of a title wins.
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.title.clone()) {
            continue;
        }
        // 4. Decode and render each surviving record independently.
        let content = markdown::render(&markup::decode(&record.payload));
        conversion
            .notes
            .push(Note::new(record.title, content, record.folder));
    }
    conversion.recovered = conversion.notes.len();

    // 5. Media extraction is gated by its own toggle.
    if options.extract_media {
        let located = media::locate(data);
        conversion.messages.extend(located.messages);
        conversion.attachments = located.attachments;
    }

    Ok(conversion)
}
