//! Markdown Renderer: serializes a content tree into Markdown text.
//!
//! Pure and deterministic; rendering the same tree twice yields
//! byte-identical output. Media references render as bracketed
//! placeholders which the export layer rewrites once attachments have
//! been extracted.

use crate::markup::{Block, Inline};
use crate::model::MediaKind;

/// Renders a root-level content tree. Blocks are separated by a single
/// blank line; an empty tree renders to an empty string.
pub fn render(blocks: &[Block]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(blocks.len());
    // Ordered-list numbering counts up within a contiguous run of ordered
    // items at the same indent depth and restarts whenever the run breaks.
    let mut ordered_run: Option<(u8, usize)> = None;
    for block in blocks {
        let mut next_run = None;
        let part = match block {
            Block::Paragraph(content) => render_inlines(content),
            Block::Heading { level, content } => {
                format!("{} {}", "#".repeat(*level as usize), render_inlines(content))
            }
            Block::ListItem { ordered: false, indent, content } => {
                format!("{}- {}", "  ".repeat(*indent as usize), render_inlines(content))
            }
            Block::ListItem { ordered: true, indent, content } => {
                let n = match ordered_run {
                    Some((depth, n)) if depth == *indent => n,
                    _ => 1,
                };
                next_run = Some((*indent, n + 1));
                format!("{}{}. {}", "  ".repeat(*indent as usize), n, render_inlines(content))
            }
            Block::ChecklistItem { checked, content } => {
                format!("- [{}] {}", if *checked { "x" } else { " " }, render_inlines(content))
            }
            Block::Blockquote(content) => render_inlines(content)
                .lines()
                .map(|line| format!("> {}", line))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Rule => "---".to_string(),
        };
        ordered_run = next_run;
        parts.push(part);
    }
    parts.join("\n\n")
}

/// Renders inline content; nesting composes innermost-first.
pub fn render_inlines(content: &[Inline]) -> String {
    let mut out = String::new();
    for node in content {
        match node {
            Inline::Text(text) => out.push_str(text),
            Inline::Bold(children) => wrap(&mut out, "**", children),
            Inline::Italic(children) => wrap(&mut out, "*", children),
            Inline::Underline(children) => wrap(&mut out, "_", children),
            Inline::Strikethrough(children) => wrap(&mut out, "~~", children),
            Inline::Highlight(children) => wrap(&mut out, "==", children),
            Inline::Media { kind: MediaKind::Image, id } => {
                out.push_str(&format!("[Image: {}]", id));
            }
            Inline::Media { kind: MediaKind::Audio, id } => {
                out.push_str(&format!("[Audio: {}]", id));
            }
        }
    }
    out
}

fn wrap(out: &mut String, delim: &str, children: &[Inline]) {
    out.push_str(delim);
    out.push_str(&render_inlines(children));
    out.push_str(delim);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn empty_tree_renders_to_empty_string() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn bold_renders_with_double_asterisks() {
        let tree = [Block::Paragraph(vec![Inline::Bold(vec![text("x")])])];
        assert_eq!(render(&tree), "**x**");
    }

    #[test]
    fn nesting_composes_innermost_first() {
        let tree = [Block::Paragraph(vec![Inline::Italic(vec![Inline::Bold(vec![text("x")])])])];
        assert_eq!(render(&tree), "***x***");
    }

    #[test]
    fn checklist_items_render_markers() {
        let done = [Block::ChecklistItem { checked: true, content: vec![text("done")] }];
        let open = [Block::ChecklistItem { checked: false, content: vec![text("done")] }];
        assert_eq!(render(&done), "- [x] done");
        assert_eq!(render(&open), "- [ ] done");
    }

    #[test]
    fn headings_render_per_level() {
        let tree = [
            Block::Heading { level: 1, content: vec![text("Top")] },
            Block::Heading { level: 2, content: vec![text("Sub")] },
        ];
        assert_eq!(render(&tree), "# Top\n\n## Sub");
    }

    #[test]
    fn ordered_run_numbering_restarts_on_break() {
        let item = |ordered, indent, label: &str| Block::ListItem {
            ordered,
            indent,
            content: vec![text(label)],
        };
        let tree = [
            item(true, 0, "a"),
            item(true, 0, "b"),
            item(false, 0, "c"),
            item(true, 0, "d"),
            item(true, 1, "e"),
        ];
        assert_eq!(
            render(&tree),
            "1. a\n\n2. b\n\n- c\n\n1. d\n\n  1. e"
        );
    }

    #[test]
    fn blockquote_prefixes_every_line() {
        let tree = [Block::Blockquote(vec![text("one"), text("\n"), text("two")])];
        assert_eq!(render(&tree), "> one\n> two");
    }

    #[test]
    fn media_placeholders() {
        let id = "f".repeat(40);
        let tree = [Block::Paragraph(vec![
            Inline::Media { kind: MediaKind::Image, id: id.clone() },
            text(" "),
            Inline::Media { kind: MediaKind::Audio, id: id.clone() },
        ])];
        assert_eq!(
            render(&tree),
            format!("[Image: {}] [Audio: {}]", id, id)
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let tree = [
            Block::Heading { level: 1, content: vec![text("T")] },
            Block::Paragraph(vec![Inline::Bold(vec![text("b")]), text(" plain")]),
            Block::Rule,
        ];
        assert_eq!(render(&tree), render(&tree));
    }

    #[test]
    fn rendered_markdown_is_structurally_valid() {
        use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
        let tree = [
            Block::Heading { level: 1, content: vec![text("Title")] },
            Block::Paragraph(vec![Inline::Bold(vec![text("strong")])]),
        ];
        let markdown = render(&tree);
        let events: Vec<Event> = Parser::new(&markdown).collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Start(Tag::Heading { level: HeadingLevel::H1, .. }))));
        assert!(events.iter().any(|e| matches!(e, Event::Start(Tag::Strong))));
    }
}
