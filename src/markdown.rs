//! Markdown -> AMA renderer: the external collaborator spec.md §1 and §6
//! describe only by contract (`render_ama(lines, width, frontmatter,
//! base_path) -> lines`). Built on `pulldown-cmark`, the corpus's standard
//! Markdown parser (see `oberien-heradoc`, `timabell-markdown-neuraxis` in
//! the reference pack), since the internal structure isn't specified and a
//! hand-rolled block parser would just be a worse pulldown-cmark.

use std::path::Path;

use pulldown_cmark::{Event, Options, Parser, Tag};

use crate::frontmatter::Frontmatter;

/// Private-use marker wrapping a hyperlink control sequence so word-wrap
/// treats `%l<TARGET>:<label>%t` as one atomic token instead of breaking it
/// across lines at an internal space in the label.
const MARKER: char = '\u{E000}';

pub fn render_ama(
    markdown: &str,
    width: usize,
    frontmatter: &Frontmatter,
    _base_path: &Path,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = frontmatter.title.as_ref().filter(|t| !t.trim().is_empty()) {
        lines.push(title.to_uppercase());
        lines.push(String::new());
    }

    let parser = Parser::new_ext(markdown, Options::empty());
    let mut buffer = String::new();
    let mut link_start: Option<usize> = None;
    let mut link_dest: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading(..)) => buffer.clear(),
            Event::End(Tag::Heading(..)) => {
                flush_heading(&mut lines, &buffer, width);
                buffer.clear();
            }
            Event::Start(Tag::Paragraph) | Event::Start(Tag::Item) => buffer.clear(),
            Event::End(Tag::Paragraph) | Event::End(Tag::Item) => {
                flush_paragraph(&mut lines, &buffer, width);
                lines.push(String::new());
                buffer.clear();
            }
            Event::Start(Tag::CodeBlock(_)) => buffer.clear(),
            Event::End(Tag::CodeBlock(_)) => {
                for code_line in buffer.lines() {
                    lines.push(code_line.trim_end().replace('\t', "    "));
                }
                lines.push(String::new());
                buffer.clear();
            }
            Event::Start(Tag::Link(_, dest, _)) => {
                link_dest = Some(dest.to_string());
                link_start = Some(buffer.len());
            }
            Event::End(Tag::Link(..)) => {
                let start = link_start.take().unwrap_or(buffer.len());
                let label = buffer[start..].to_string();
                buffer.truncate(start);
                let target = link_dest.take().unwrap_or_default();
                if target.to_uppercase().ends_with(".AMA") {
                    let control = format!("%l{}:{}%t", target.to_uppercase(), label);
                    buffer.push(MARKER);
                    buffer.push_str(&control);
                    buffer.push(MARKER);
                } else {
                    buffer.push_str(&format!("[{}]({})", label, target));
                }
            }
            Event::Text(text) | Event::Code(text) => buffer.push_str(&text),
            Event::SoftBreak | Event::HardBreak => buffer.push(' '),
            _ => {}
        }
    }
    if !buffer.trim().is_empty() {
        flush_paragraph(&mut lines, &buffer, width);
    }

    lines
}

fn flush_heading(lines: &mut Vec<String>, buffer: &str, width: usize) {
    let heading = strip_markers(buffer.trim()).to_uppercase();
    let rule_len = heading.chars().count().min(width.max(1));
    lines.push(heading);
    lines.push("=".repeat(rule_len));
    lines.push(String::new());
}

fn flush_paragraph(lines: &mut Vec<String>, buffer: &str, width: usize) {
    if buffer.trim().is_empty() {
        return;
    }
    for wrapped in wrap_with_markers(buffer.trim(), width) {
        lines.push(wrapped);
    }
}

fn strip_markers(text: &str) -> String {
    text.chars().filter(|c| *c != MARKER).collect()
}

/// Word-wrap `text` to `width` columns, treating any run delimited by
/// [`MARKER`] as a single unbreakable token.
fn wrap_with_markers(text: &str, width: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for token in tokens {
        let token_len = display_len(&token);
        if current.is_empty() {
            current.push_str(&token);
            current_len = token_len;
        } else if current_len + 1 + token_len <= width.max(1) {
            current.push(' ');
            current.push_str(&token);
            current_len += 1 + token_len;
        } else {
            out.push(strip_markers(&current));
            current = token;
            current_len = token_len;
        }
    }
    if !current.is_empty() {
        out.push(strip_markers(&current));
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(stripped) = rest.strip_prefix(MARKER) {
            if let Some(end) = stripped.find(MARKER) {
                tokens.push(stripped[..end].to_string());
                rest = &stripped[end + MARKER.len_utf8()..];
                continue;
            }
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        tokens.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    tokens
}

fn display_len(token: &str) -> usize {
    token.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn render(md: &str) -> Vec<String> {
        render_ama(md, 78, &Frontmatter::default(), &PathBuf::from("."))
    }

    #[test]
    fn heading_is_uppercased_with_rule() {
        let lines = render("# Hi");
        assert_eq!(lines[0], "HI");
        assert_eq!(lines[1], "==");
    }

    #[test]
    fn local_ama_link_becomes_control_sequence() {
        let lines = render("[next](B.AMA)");
        assert!(lines.iter().any(|l| l == "%lB.AMA:next%t"));
    }

    #[test]
    fn non_local_link_is_left_verbatim() {
        let lines = render("[site](https://example.com)");
        assert!(lines.iter().any(|l| l.contains("[site](https://example.com)")));
    }

    #[test]
    fn emphasis_is_flattened_to_plain_text() {
        let lines = render("this is **bold** and *italic*");
        assert!(lines.iter().any(|l| l.contains("this is bold and italic")));
    }

    #[test]
    fn no_tabs_or_embedded_newlines_in_output() {
        let lines = render("# Title\n\nSome paragraph text here.\n\n```\ncode\tline\n```");
        for line in &lines {
            assert!(!line.contains('\n'));
        }
    }
}
