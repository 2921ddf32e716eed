//! Front-matter parser: the external collaborator spec.md §1 treats as
//! out-of-scope but whose contract this crate still has to satisfy end to
//! end. Recognizes a leading `---`-delimited YAML block, Jekyll/Hugo style.

use serde::Deserialize;

/// Parsed front-matter. `extra` keeps every field besides `title` around
/// for renderers that might want them later; this crate only reads `title`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// Split a leading `---\n...\n---\n` block off of `lines`, parsing it as
/// YAML. Returns an empty `Frontmatter` and the original lines unchanged
/// when there's no leading `---` delimiter.
pub fn parse_frontmatter(lines: &[String]) -> (Frontmatter, Vec<String>) {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return (Frontmatter::default(), lines.to_vec());
    }

    let closing = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| l.trim_end() == "---")
        .map(|(i, _)| i);

    match closing {
        Some(end) => {
            let yaml_block = lines[1..end].join("\n");
            let frontmatter = serde_yaml::from_str(&yaml_block).unwrap_or_default();
            (frontmatter, lines[end + 1..].to_vec())
        }
        None => (Frontmatter::default(), lines.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_lines(s: &str) -> Vec<String> {
        s.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn no_frontmatter_passes_through() {
        let lines = to_lines("# Hello\nworld");
        let (fm, body) = parse_frontmatter(&lines);
        assert!(fm.title.is_none());
        assert_eq!(body, lines);
    }

    #[test]
    fn parses_title_and_strips_block() {
        let lines = to_lines("---\ntitle: My Book\n---\n# Hello");
        let (fm, body) = parse_frontmatter(&lines);
        assert_eq!(fm.title.as_deref(), Some("My Book"));
        assert_eq!(body, vec!["# Hello".to_string()]);
    }

    #[test]
    fn unterminated_block_passes_through_untouched() {
        let lines = to_lines("---\ntitle: Oops\nno closing delimiter");
        let (fm, body) = parse_frontmatter(&lines);
        assert!(fm.title.is_none());
        assert_eq!(body, lines);
    }
}
