//! Backup Scanner: locates the notes section inside the backup blob and
//! segments it into raw per-note records.
//!
//! The format has no authoritative schema, so segmentation is heuristic.
//! Two strategies compose: the primary folder-marker pattern claims spans
//! and fixes their folder tag; a field-tag fallback salvages titles from
//! the bytes the primary pass did not claim. Primary always wins; the
//! fallback only fires in unclaimed gaps.

use crate::api::Message;
use crate::error::{MinotesError, Result};
use crate::model::Folder;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

const SECTION_MARKER: &[u8] = b"miui_bak/_tmp_bak";
const SECTION_END_MARKERS: [&[u8]; 2] = [b"miui_att/", b"apps/com.miui.notes/miui_att"];
// An attachment-area literal this close to the section start is a spurious
// hit and must not truncate the section.
const SECTION_END_GUARD: usize = 1000;

// Field 2 tag of the backup's nested serialization; delimits the
// length-prefixed strings the fallback strategy segments on.
const FIELD_TAG: u8 = 0x12;

// `z <len-byte> <folder literal>` marks the start of one note record.
static FOLDER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s-u)z.(common|secret)").unwrap());

static FIRST_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)<(new-format|text|bullet|order|input|hr|quote|sound)").unwrap());

// A closing construct immediately followed by `J` and a high byte is the
// field separator that ends the markup document.
static PAYLOAD_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)(</quote>|</text>|/>)J[\x80-\xff]").unwrap());

static TITLE_JUNK_PREFIX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^[^\p{L}\p{N}]+").unwrap());
static TITLE_JUNK_SUFFIX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"[^\p{L}\p{N}!?.)]+$").unwrap());

/// Which boundary-detection strategy produced a record. The caller uses
/// this to filter historical (deleted) salvage out of the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryStrategy {
    FolderMarker,
    FieldTag,
}

/// One raw note recovered from the buffer, not yet decoded.
#[derive(Debug, Clone)]
pub struct RawNoteRecord {
    pub title: String,
    pub payload: String,
    pub folder: Folder,
    pub origin: BoundaryStrategy,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<RawNoteRecord>,
    pub messages: Vec<Message>,
    pub skipped: usize,
}

/// Segments the backup buffer into raw note records.
///
/// Fatal only when the notes section marker is absent; individual spans
/// that cannot be parsed are skipped with a diagnostic and scanning
/// continues at the next marker. Deleted-notes filtering is the caller's
/// concern: the full set found in the buffer is returned.
pub fn scan(data: &[u8]) -> Result<ScanOutcome> {
    let section = notes_section(data)?;
    let mut outcome = ScanOutcome::default();

    // 1. Primary strategy: every folder marker starts one record.
    let marks: Vec<(usize, usize, Folder)> = FOLDER_MARKER
        .captures_iter(section)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let folder = if &caps[1] == b"secret" {
                Folder::Secret
            } else {
                Folder::Common
            };
            (whole.start(), whole.end(), folder)
        })
        .collect();

    for (i, (_, span_start, folder)) in marks.iter().enumerate() {
        let span_end = marks.get(i + 1).map(|m| m.0).unwrap_or(section.len());
        let span = &section[*span_start..span_end];
        match primary_record(span, *folder) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                outcome.skipped += 1;
                outcome
                    .messages
                    .push(Message::warning(format!("Skipping note span {}: {}", i + 1, reason)));
            }
        }
    }

    // 2. Fallback strategy: salvage titles from the gap the markers did
    // not claim. Best effort; rejected fields are not diagnostics.
    let gap_end = marks.first().map(|m| m.0).unwrap_or(section.len());
    outcome.records.extend(fallback_records(&section[..gap_end]));

    Ok(outcome)
}

/// Slices the notes section out of the full backup buffer.
pub fn notes_section(data: &[u8]) -> Result<&[u8]> {
    let start = find_bytes(data, SECTION_MARKER).ok_or(MinotesError::SectionNotFound)?;
    let mut section = &data[start..];
    for marker in SECTION_END_MARKERS {
        if let Some(end) = find_bytes(section, marker).filter(|e| *e > SECTION_END_GUARD) {
            section = &section[..end];
            break;
        }
    }
    Ok(section)
}

fn primary_record(span: &[u8], folder: Folder) -> std::result::Result<RawNoteRecord, String> {
    let raw_title = span_title(span).ok_or_else(|| "no title field at span end".to_string())?;
    let title = clean_title(&raw_title);
    if title.is_empty() {
        return Err("title is empty after cleaning".to_string());
    }
    let payload =
        markup_payload(span).ok_or_else(|| "no markup payload located".to_string())?;
    Ok(RawNoteRecord {
        title,
        payload,
        folder,
        origin: BoundaryStrategy::FolderMarker,
    })
}

/// Title field: `r <len-byte> <bytes>` anchored at the end of the span.
/// The candidate nearest the span end wins, and a recorded length shorter
/// than the trailing bytes truncates the title to that length.
fn span_title(span: &[u8]) -> Option<String> {
    for pos in (0..span.len().saturating_sub(2)).rev() {
        if span[pos] != b'r' {
            continue;
        }
        let len = span[pos + 1] as usize;
        let body = &span[pos + 2..];
        if (1..=200).contains(&len) && body.len() >= len && body[..len].iter().all(|b| *b >= 0x20) {
            return Some(String::from_utf8_lossy(&body[..len]).into_owned());
        }
    }
    None
}

/// Extracts the markup document embedded in a span. The payload sits
/// between the first recognized opening tag and the backup's field
/// separator; surrounding binary fields are stripped.
fn markup_payload(span: &[u8]) -> Option<String> {
    let start = FIRST_TAG.find(span)?.start();
    let tail = &span[start..];
    let cut = if let Some(caps) = PAYLOAD_END.captures(tail) {
        caps.get(1).unwrap().end()
    } else if let Some(mime) = find_bytes(tail, b"vnd.android").filter(|p| *p > 10) {
        // No separator; cut at the MIME literal and trim to the last
        // closing construct before it.
        last_tag_end(&tail[..mime]).unwrap_or(mime)
    } else {
        tail.len()
    };
    Some(String::from_utf8_lossy(&tail[..cut]).into_owned())
}

fn last_tag_end(chunk: &[u8]) -> Option<usize> {
    let closers: [&[u8]; 4] = [b"</quote>", b"</text>", b"<hr />", b"/>"];
    let last_close = closers
        .iter()
        .filter_map(|needle| rfind_bytes(chunk, needle))
        .max()?;
    chunk[last_close..]
        .iter()
        .position(|b| *b == b'>')
        .map(|p| last_close + p + 1)
}

fn fallback_records(gap: &[u8]) -> Vec<RawNoteRecord> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos + 3 < gap.len() {
        if gap[pos] == FIELD_TAG {
            let len = gap[pos + 1] as usize;
            if (2..=200).contains(&len) && pos + 2 + len <= gap.len() {
                if let Ok(text) = std::str::from_utf8(&gap[pos + 2..pos + 2 + len]) {
                    if plausible_title(text) {
                        let title = clean_title(text);
                        if !title.is_empty() {
                            // These records predate the folder feature or
                            // were deleted; only their title survives.
                            records.push(RawNoteRecord {
                                payload: title.clone(),
                                title,
                                folder: Folder::Common,
                                origin: BoundaryStrategy::FieldTag,
                            });
                        }
                        pos += 2 + len;
                        continue;
                    }
                }
            }
        }
        pos += 1;
    }
    records
}

fn plausible_title(text: &str) -> bool {
    text.chars().count() >= 2
        && text.chars().any(|c| c.is_alphabetic())
        && !text.starts_with('<')
        && !text.starts_with("vnd.")
        && !text.ends_with(".mp3")
        && !text.ends_with(".jpeg")
        && text != "false"
        && text != "true"
}

fn clean_title(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| {
            !matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}' | '\u{fffd}')
        })
        .collect();
    let no_prefix = TITLE_JUNK_PREFIX.replace(stripped.trim(), "");
    let cleaned = TITLE_JUNK_SUFFIX.replace(no_prefix.as_ref(), "");
    cleaned.chars().take(100).collect()
}

pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
