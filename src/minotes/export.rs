//! Export collaborator: writes notes and attachments to disk.
//!
//! Owns filename sanitization, duplicate-name suffixing, directory layout
//! and the substitution of media placeholders with links to the saved
//! attachment files.

use crate::api::Message;
use crate::error::Result;
use crate::media::Attachment;
use crate::model::Note;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_FILENAME_LEN: usize = 80;

#[derive(Debug, Default)]
pub struct ExportReport {
    /// Note filenames in the order they were written.
    pub files: Vec<String>,
    pub notes_written: usize,
    pub attachments_written: usize,
    pub messages: Vec<Message>,
}

/// Writes all notes (and attachments, when present) under `dir`.
/// Attachments go first so their relative paths can replace the media
/// placeholders in note bodies.
pub fn export(
    notes: &[Note],
    attachments: &BTreeMap<String, Attachment>,
    dir: &Path,
) -> Result<ExportReport> {
    fs::create_dir_all(dir)?;
    let mut report = ExportReport::default();

    // 1. Attachments, keyed id → relative path for substitution.
    let mut media_paths: BTreeMap<String, String> = BTreeMap::new();
    if !attachments.is_empty() {
        let attachments_dir = dir.join("attachments");
        fs::create_dir_all(&attachments_dir)?;
        for attachment in attachments.values() {
            let filename = format!("{}.{}", attachment.id, attachment.format.extension());
            fs::write(attachments_dir.join(&filename), &attachment.data)?;
            media_paths.insert(attachment.id.clone(), format!("attachments/{}", filename));
            report.attachments_written += 1;
        }
    }

    // 2. Notes, deduplicating filenames in encounter order.
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for note in notes {
        let content = substitute_media(&note.content, &media_paths);
        let content = if content.trim().chars().count() < 2 {
            // A trivially short body is still worth a file when the title
            // carries the note, as with title-only historical salvage.
            if note.title.chars().count() > 2 {
                String::new()
            } else {
                report
                    .messages
                    .push(Message::info(format!("Skipping empty note: {}", note.title)));
                continue;
            }
        } else {
            content
        };

        let base = sanitize_filename(&note.title);
        let filename = match seen.get_mut(&base) {
            Some(count) => {
                *count += 1;
                format!("{}_{}.md", base, count)
            }
            None => {
                seen.insert(base.clone(), 0);
                format!("{}.md", base)
            }
        };

        let mut body = format!("# {}\n\n", note.title);
        if !content.is_empty() {
            body.push_str(&content);
            body.push('\n');
        }
        fs::write(dir.join(&filename), body)?;
        report.files.push(filename);
        report.notes_written += 1;
    }
    Ok(report)
}

/// Rewrites media placeholders in place for every id with an extracted
/// file; unmatched placeholders stay as-is.
pub fn substitute_media(content: &str, media_paths: &BTreeMap<String, String>) -> String {
    let mut out = content.to_string();
    for (id, path) in media_paths {
        out = out.replace(
            &format!("[Image: {}]", id),
            &format!("![Image]({})", path),
        );
        out = out.replace(&format!("[Audio: {}]", id), &format!("[Audio]({})", path));
    }
    out
}

pub fn sanitize_filename(title: &str) -> String {
    let stripped = INVALID_FILENAME_CHARS.replace_all(title, "");
    let collapsed = WHITESPACE_RUN.replace_all(stripped.as_ref(), " ");
    let name: String = collapsed.trim().chars().take(MAX_FILENAME_LEN).collect();
    if name.is_empty() {
        "untitled".to_string()
    } else {
        name
    }
}
