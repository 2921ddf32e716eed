//! Component C: reads each article's Markdown source, rewrites local links
//! that resolve to another article in the book, then delegates to the
//! front-matter parser and Markdown renderer collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::discovery::{Article, MARKDOWN_LINK_RE};
use crate::error::Result;
use crate::frontmatter::parse_frontmatter;
use crate::markdown::render_ama;

const RENDER_WIDTH: usize = 78;

/// Render every article to its (pre-split) AMA lines, keyed by AMA filename.
pub fn render_articles(articles: &HashMap<PathBuf, Article>) -> Result<HashMap<String, Vec<String>>> {
    let mut rendered = HashMap::with_capacity(articles.len());
    for article in articles.values() {
        let content = std::fs::read_to_string(&article.source)?;
        let base_dir = article
            .source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let rewritten = rewrite_links(&content, &base_dir, articles);

        let lines: Vec<String> = rewritten.lines().map(str::to_string).collect();
        let (frontmatter, body_lines) = parse_frontmatter(&lines);
        let body = body_lines.join("\n");

        let ama_lines = render_ama(&body, RENDER_WIDTH, &frontmatter, &base_dir);
        rendered.insert(article.ama_name.clone(), ama_lines);
    }
    Ok(rendered)
}

/// Substitute the target of every local Markdown link whose resolved path
/// is present in `articles` with that article's AMA filename, keeping the
/// `[text](` and `)` bracketing literal (spec.md §4.C). Links to targets
/// outside the article set are left verbatim.
fn rewrite_links(markdown: &str, base_dir: &Path, articles: &HashMap<PathBuf, Article>) -> String {
    MARKDOWN_LINK_RE
        .replace_all(markdown, |caps: &regex::Captures| {
            let prefix = &caps[1];
            let target = caps[2].trim();
            let suffix = &caps[3];

            let without_fragment = target.split('#').next().unwrap_or(target);
            let candidate = base_dir.join(without_fragment);
            let resolved = candidate.canonicalize().unwrap_or(candidate);

            match articles.get(&resolved) {
                Some(article) => format!("{}{}{}", prefix, article.ama_name, suffix),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::collect_articles;
    use std::fs;

    #[test]
    fn rewrites_link_to_article_in_set() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        fs::write(&a, "[next](b.md)").unwrap();
        fs::write(&b, "body").unwrap();

        let articles = collect_articles(&a).unwrap();
        let rendered = render_articles(&articles).unwrap();

        let a_ama = &articles[&a.canonicalize().unwrap()].ama_name;
        let index_lines = &rendered[a_ama];
        assert!(index_lines.iter().any(|l| l.contains("%lB.AMA:next%t")));
    }

    #[test]
    fn leaves_dangling_external_link_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        fs::write(&a, "[site](https://example.com)").unwrap();

        let articles = collect_articles(&a).unwrap();
        let rendered = render_articles(&articles).unwrap();
        let index_lines = &rendered["INDEX.AMA"];
        assert!(index_lines
            .iter()
            .any(|l| l.contains("[site](https://example.com)")));
    }
}
