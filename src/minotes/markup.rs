//! Markup Decoder: parses the proprietary tag dialect embedded in note
//! payloads into a semantic content tree.
//!
//! The vocabulary is small and reverse-engineered, so the decoder favors
//! graceful degradation over rejection: unrecognized tags are preserved
//! verbatim as literal text, a close tag with no matching open terminates
//! the current node early, and unclosed containers close at end of input.
//! Decoding never fails.

use crate::model::MediaKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Block-level node. The root of a decoded document is an ordered
/// sequence of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    ListItem { ordered: bool, indent: u8, content: Vec<Inline> },
    ChecklistItem { checked: bool, content: Vec<Inline> },
    Blockquote(Vec<Inline>),
    Rule,
}

/// Inline node. Inline variants never contain block variants; the two
/// types enforce that structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Underline(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Highlight(Vec<Inline>),
    Media { kind: MediaKind, id: String },
}

/// Decodes one markup payload into a content tree. Malformed input
/// degrades to literal text or early node termination; an empty payload
/// yields an empty tree.
pub fn decode(payload: &str) -> Vec<Block> {
    let mut parser = Parser {
        tokens: lex(payload),
        pos: 0,
    };
    parser.parse_blocks()
}

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    Text(&'a str),
    Newline,
    Open { name: &'a str, attrs: &'a str, raw: &'a str },
    SelfClose { name: &'a str, attrs: &'a str, raw: &'a str },
    Close { name: &'a str, raw: &'a str },
}

fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut text_start = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'<' {
            if let Some((token, end)) = lex_tag(input, pos) {
                push_text_tokens(&mut tokens, &input[text_start..pos]);
                tokens.push(token);
                pos = end;
                text_start = pos;
                continue;
            }
        }
        pos += 1;
    }
    push_text_tokens(&mut tokens, &input[text_start..]);
    tokens
}

// Text tokens never span a line break; list-item runs end at one.
fn push_text_tokens<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str) {
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(Token::Newline);
        }
        if !segment.is_empty() {
            tokens.push(Token::Text(segment));
        }
    }
}

fn lex_tag(input: &str, start: usize) -> Option<(Token<'_>, usize)> {
    let rest = &input[start..];
    let end_rel = rest.find('>')?;
    let raw = &rest[..end_rel + 1];
    let inner = &raw[1..raw.len() - 1];
    let (is_close, inner) = match inner.strip_prefix('/') {
        Some(stripped) => (true, stripped),
        None => (false, inner),
    };
    let (inner, is_self) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };
    let name_len = inner
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
        .count();
    if name_len == 0 || !inner.as_bytes()[0].is_ascii_alphabetic() {
        return None;
    }
    let name = &inner[..name_len];
    let attrs = inner[name_len..].trim();
    let token = if is_close {
        Token::Close { name, raw }
    } else if is_self {
        Token::SelfClose { name, attrs, raw }
    } else {
        Token::Open { name, attrs, raw }
    };
    Some((token, start + end_rel + 1))
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "text" | "quote" | "size" | "mid-size" | "h3-size" | "bullet" | "order" | "input" | "hr"
            | "new-format"
    )
}

fn is_inline_tag(name: &str) -> bool {
    matches!(name, "b" | "i" | "u" | "delete" | "background" | "center" | "right")
}

fn is_known_tag(name: &str) -> bool {
    is_block_tag(name) || is_inline_tag(name) || matches!(name, "sound" | "img")
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "size" => Some(1),
        "mid-size" => Some(2),
        "h3-size" => Some(3),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).copied() {
            match token {
                Token::Open { name: "text", .. } => {
                    self.pos += 1;
                    self.parse_text_container(&mut blocks);
                }
                Token::Open { name: "quote", .. } => {
                    self.pos += 1;
                    let content = self.parse_quote();
                    if !is_blank(&content) {
                        blocks.push(Block::Blockquote(content));
                    }
                }
                Token::Open { name, .. } if heading_level(name).is_some() => {
                    self.pos += 1;
                    let (mut content, _) = self.parse_inlines(&mut vec![name], false);
                    trim_edges(&mut content);
                    if !is_blank(&content) {
                        blocks.push(Block::Heading {
                            level: heading_level(name).unwrap(),
                            content,
                        });
                    }
                }
                Token::Open { name: name @ ("bullet" | "order"), attrs, .. }
                | Token::SelfClose { name: name @ ("bullet" | "order"), attrs, .. } => {
                    self.pos += 1;
                    let indent = attr(attrs, "indent")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    let (mut content, _) = self.parse_inlines(&mut Vec::new(), true);
                    trim_edges(&mut content);
                    if !is_blank(&content) {
                        blocks.push(Block::ListItem {
                            ordered: name == "order",
                            indent,
                            content,
                        });
                    }
                }
                Token::Open { name: "input", attrs, .. }
                | Token::SelfClose { name: "input", attrs, .. } => {
                    self.pos += 1;
                    let checked = attr(attrs, "checked").as_deref() == Some("true");
                    let (mut content, _) = self.parse_inlines(&mut Vec::new(), true);
                    trim_edges(&mut content);
                    if !is_blank(&content) {
                        blocks.push(Block::ChecklistItem { checked, content });
                    }
                }
                Token::Open { name: "hr", .. } | Token::SelfClose { name: "hr", .. } => {
                    self.pos += 1;
                    blocks.push(Block::Rule);
                }
                Token::Close { name, .. } if is_known_tag(name) => {
                    // Stray close between blocks; nothing to terminate.
                    self.pos += 1;
                }
                Token::Open { name, .. } | Token::SelfClose { name, .. }
                    if is_block_tag(name) =>
                {
                    // <new-format/> and degenerate empty block tags.
                    self.pos += 1;
                }
                _ => {
                    // Bare text and inline content form an implicit paragraph.
                    let (mut content, _) = self.parse_inlines(&mut Vec::new(), false);
                    trim_edges(&mut content);
                    if !is_blank(&content) {
                        blocks.push(Block::Paragraph(content));
                    }
                }
            }
        }
        blocks
    }

    /// Parses the body of a `<text>` container. Heading tags nest inside
    /// these in the wild; they are lifted to block level, splitting the
    /// surrounding paragraph.
    fn parse_text_container(&mut self, blocks: &mut Vec<Block>) {
        let mut current: Vec<Inline> = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).copied() {
            if let Token::Open { name, .. } = token {
                if let Some(level) = heading_level(name) {
                    self.pos += 1;
                    let (mut content, _) = self.parse_inlines(&mut vec![name], false);
                    trim_edges(&mut content);
                    flush_paragraph(&mut current, blocks);
                    if !is_blank(&content) {
                        blocks.push(Block::Heading { level, content });
                    }
                    continue;
                }
            }
            let (chunk, closed) = self.parse_inlines(&mut vec!["text"], false);
            current.extend(chunk);
            if closed {
                break;
            }
            // Stopped at a block tag; only headings stay inside the container.
            match self.tokens.get(self.pos).copied() {
                Some(Token::Open { name, .. }) if heading_level(name).is_some() => continue,
                _ => break,
            }
        }
        flush_paragraph(&mut current, blocks);
    }

    /// Parses the body of a `<quote>`. Nested `<text>` children contribute
    /// one line each; lines are joined with newline text nodes.
    fn parse_quote(&mut self) -> Vec<Inline> {
        let mut lines: Vec<Vec<Inline>> = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).copied() {
            match token {
                Token::Close { name: "quote", .. } => {
                    self.pos += 1;
                    break;
                }
                Token::Open { name: "text", .. } => {
                    self.pos += 1;
                    let (mut line, _) = self.parse_inlines(&mut vec!["quote", "text"], false);
                    trim_edges(&mut line);
                    if !is_blank(&line) {
                        lines.push(line);
                    }
                }
                Token::Newline => self.pos += 1,
                Token::Open { name, .. } | Token::SelfClose { name, .. }
                    if is_block_tag(name) && name != "text" =>
                {
                    // Unterminated quote; let the top level handle it.
                    break;
                }
                _ => {
                    let (mut line, closed) = self.parse_inlines(&mut vec!["quote"], false);
                    trim_edges(&mut line);
                    if !is_blank(&line) {
                        lines.push(line);
                    }
                    if closed {
                        break;
                    }
                }
            }
        }
        let mut content: Vec<Inline> = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                content.push(Inline::Text("\n".to_string()));
            }
            content.extend(line);
        }
        content
    }

    /// Collects inline content until a block boundary. `stack` holds the
    /// names of open containers, innermost last. Returns the collected
    /// nodes and whether the innermost container was explicitly closed.
    fn parse_inlines(
        &mut self,
        stack: &mut Vec<&'a str>,
        stop_at_newline: bool,
    ) -> (Vec<Inline>, bool) {
        let mut out = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).copied() {
            match token {
                Token::Newline => {
                    self.pos += 1;
                    if stop_at_newline {
                        return (out, true);
                    }
                    push_text(&mut out, "\n");
                }
                Token::Text(text) => {
                    self.pos += 1;
                    text_inlines(text, &mut out);
                }
                Token::Open { name: "sound", attrs, .. }
                | Token::SelfClose { name: "sound", attrs, .. } => {
                    self.pos += 1;
                    if let Some(id) = attr(attrs, "fileid") {
                        out.push(Inline::Media { kind: MediaKind::Audio, id });
                    }
                }
                Token::Open { name: "img", attrs, .. }
                | Token::SelfClose { name: "img", attrs, .. } => {
                    self.pos += 1;
                    if let Some(id) = attr(attrs, "fileid") {
                        out.push(Inline::Media { kind: MediaKind::Image, id });
                    }
                }
                Token::Open { name, .. } | Token::SelfClose { name, .. }
                    if is_block_tag(name) =>
                {
                    return (out, false);
                }
                Token::Open { name, .. } if is_inline_tag(name) => {
                    self.pos += 1;
                    stack.push(name);
                    let (children, _) = self.parse_inlines(stack, stop_at_newline);
                    stack.pop();
                    match name {
                        "b" => out.push(Inline::Bold(children)),
                        "i" => out.push(Inline::Italic(children)),
                        "u" => out.push(Inline::Underline(children)),
                        "delete" => out.push(Inline::Strikethrough(children)),
                        "background" => out.push(Inline::Highlight(children)),
                        // Alignment is transparent; children pass through.
                        _ => out.extend(children),
                    }
                }
                Token::SelfClose { name, .. } if is_inline_tag(name) => {
                    self.pos += 1;
                }
                Token::Open { raw, .. } | Token::SelfClose { raw, .. } => {
                    // Unknown tag: preserve its markup verbatim.
                    self.pos += 1;
                    push_text(&mut out, raw);
                }
                Token::Close { name, raw } => {
                    if stack.last().copied() == Some(name) {
                        self.pos += 1;
                        return (out, true);
                    }
                    if stack.contains(&name) {
                        // Close of an outer container; unwind without consuming.
                        return (out, false);
                    }
                    if is_known_tag(name) {
                        // Stray close: terminate the current node early.
                        self.pos += 1;
                        return (out, true);
                    }
                    self.pos += 1;
                    push_text(&mut out, raw);
                }
            }
        }
        // Unclosed containers close at end of input.
        (out, false)
    }
}

static RAW_IMAGE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x01☺]\s*([a-f0-9]{40})").unwrap());
static ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([a-zA-Z-]+)\s*=\s*"([^"]*)""#).unwrap());

fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR.captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
}

/// Splits a raw text segment into text and raw image references (a control
/// byte followed by a 40-char hex id, used by older records).
fn text_inlines(raw: &str, out: &mut Vec<Inline>) {
    let mut last = 0;
    for caps in RAW_IMAGE_REF.captures_iter(raw) {
        let whole = caps.get(0).unwrap();
        push_text(out, &clean_text(&raw[last..whole.start()]));
        out.push(Inline::Media {
            kind: MediaKind::Image,
            id: caps[1].to_string(),
        });
        last = whole.end();
    }
    push_text(out, &clean_text(&raw[last..]));
}

fn clean_text(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{0}'..='\u{8}' | '\u{b}'..='\u{d}' | '\u{e}'..='\u{1f}' | '\u{7f}'..='\u{9f}'
                    | '\u{fffd}'
            )
        })
        .collect();
    unescape_entities(&stripped)
}

fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let entity_end = rest[1..]
            .find(';')
            .map(|p| p + 1)
            .filter(|p| *p <= 10 && rest[1..*p].bytes().all(|b| b.is_ascii_alphanumeric() || b == b'#'));
        let decoded = entity_end.and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

fn is_blank(content: &[Inline]) -> bool {
    content
        .iter()
        .all(|node| matches!(node, Inline::Text(t) if t.trim().is_empty()))
}

fn trim_edges(content: &mut Vec<Inline>) {
    while matches!(content.first(), Some(Inline::Text(t)) if t.trim().is_empty()) {
        content.remove(0);
    }
    while matches!(content.last(), Some(Inline::Text(t)) if t.trim().is_empty()) {
        content.pop();
    }
    if let Some(Inline::Text(t)) = content.first_mut() {
        let trimmed = t.trim_start().to_string();
        *t = trimmed;
    }
    if let Some(Inline::Text(t)) = content.last_mut() {
        let trimmed = t.trim_end().to_string();
        *t = trimmed;
    }
}

fn flush_paragraph(current: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    trim_edges(current);
    if is_blank(current) {
        current.clear();
    } else {
        blocks.push(Block::Paragraph(std::mem::take(current)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn empty_payload_decodes_to_empty_tree() {
        assert!(decode("").is_empty());
    }

    #[test]
    fn text_container_becomes_paragraph() {
        let blocks = decode("<text>Hello world</text>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("Hello world")])]);
    }

    #[test]
    fn bare_text_forms_implicit_paragraph() {
        let blocks = decode("just some text");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("just some text")])]);
    }

    #[test]
    fn inline_formatting_nests() {
        let blocks = decode("<text><i><b>x</b></i></text>");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![Inline::Italic(vec![Inline::Bold(vec![text("x")])])])]
        );
    }

    #[test]
    fn unknown_tag_is_preserved_as_literal_text() {
        let blocks = decode("<foo>bar</foo>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("<foo>bar</foo>")])]);
    }

    #[test]
    fn stray_close_terminates_node_early() {
        let blocks = decode("<text>kept</quote>lost</text><text>next</text>");
        assert_eq!(blocks[0], Block::Paragraph(vec![text("kept")]));
        assert!(blocks.contains(&Block::Paragraph(vec![text("next")])));
    }

    #[test]
    fn unclosed_container_closes_at_end_of_input() {
        let blocks = decode("<text><b>dangling");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![Inline::Bold(vec![text("dangling")])])]
        );
    }

    #[test]
    fn checkbox_input_maps_to_checklist_item() {
        let blocks = decode("<input type=\"checkbox\" checked=\"true\"/>done\n<input type=\"checkbox\"/>todo");
        assert_eq!(
            blocks,
            vec![
                Block::ChecklistItem { checked: true, content: vec![text("done")] },
                Block::ChecklistItem { checked: false, content: vec![text("todo")] },
            ]
        );
    }

    #[test]
    fn bullet_and_order_map_to_list_items() {
        let blocks = decode("<bullet indent=\"0\" />milk\n<order indent=\"1\" />first");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem { ordered: false, indent: 0, content: vec![text("milk")] },
                Block::ListItem { ordered: true, indent: 1, content: vec![text("first")] },
            ]
        );
    }

    #[test]
    fn headings_are_lifted_out_of_text_containers() {
        let blocks = decode("<text>intro<mid-size>Title</mid-size>outro</text>");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![text("intro")]),
                Block::Heading { level: 2, content: vec![text("Title")] },
                Block::Paragraph(vec![text("outro")]),
            ]
        );
    }

    #[test]
    fn heading_tags_map_to_levels() {
        assert_eq!(
            decode("<size>One</size>"),
            vec![Block::Heading { level: 1, content: vec![text("One")] }]
        );
        assert_eq!(
            decode("<h3-size>Three</h3-size>"),
            vec![Block::Heading { level: 3, content: vec![text("Three")] }]
        );
    }

    #[test]
    fn quote_collects_nested_text_lines() {
        let blocks = decode("<quote><text>first</text><text>second</text></quote>");
        assert_eq!(
            blocks,
            vec![Block::Blockquote(vec![text("first"), text("\n"), text("second")])]
        );
    }

    #[test]
    fn alignment_tags_are_transparent() {
        let blocks = decode("<text><center>middle</center></text>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("middle")])]);
    }

    #[test]
    fn hr_maps_to_rule_and_new_format_is_ignored() {
        let blocks = decode("<new-format/><hr/>");
        assert_eq!(blocks, vec![Block::Rule]);
    }

    #[test]
    fn sound_tag_maps_to_audio_media() {
        let id = "a".repeat(40);
        let blocks = decode(&format!("<text><sound fileid=\"{}\"/></text>", id));
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![Inline::Media { kind: MediaKind::Audio, id }])]
        );
    }

    #[test]
    fn raw_control_byte_image_reference_is_decoded() {
        let id = "0123456789abcdef0123456789abcdef01234567";
        let blocks = decode(&format!("<text>before \u{1}{} after</text>", id));
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                text("before "),
                Inline::Media { kind: MediaKind::Image, id: id.to_string() },
                text(" after"),
            ])]
        );
    }

    #[test]
    fn html_entities_are_unescaped() {
        let blocks = decode("<text>a &amp; b &lt;c&gt; &#39;d&#x27;</text>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("a & b <c> 'd'")])]);
    }

    #[test]
    fn lone_ampersand_is_kept() {
        let blocks = decode("<text>salt & pepper</text>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("salt & pepper")])]);
    }

    #[test]
    fn control_characters_are_dropped_from_text() {
        let blocks = decode("<text>cle\u{2}an\u{fffd}</text>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("clean")])]);
    }

    #[test]
    fn strikethrough_and_highlight_tags() {
        let blocks = decode("<text><delete>gone</delete><background color=\"1\">hot</background></text>");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                Inline::Strikethrough(vec![text("gone")]),
                Inline::Highlight(vec![text("hot")]),
            ])]
        );
    }
}
