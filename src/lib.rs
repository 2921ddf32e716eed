//! Compiles a tree of interlinked Markdown documents into a single AMB1
//! binary archive: discovery (B) feeds the renderer (C, backed by the
//! codepage registry A), whose output the splitter (D) bounds to
//! AMA_MAX_BYTES, after which the word index (E) and archive packer (F)
//! run as a two-pass fixed point over DICT.IDX's self-referential offsets.

pub mod ama;
pub mod archive;
pub mod codepage;
pub mod discovery;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod markdown;
pub mod render;
pub mod splitter;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use archive::ArchiveEntry;
use codepage::CodepageRegistry;
use discovery::Article;
use error::Result;

pub const DEFAULT_CODEPAGE: &str = "437";

/// Inputs to one `build_amb` run.
pub struct BuildOptions<'a> {
    pub title: Option<&'a str>,
    pub codepage: &'a str,
}

impl<'a> Default for BuildOptions<'a> {
    fn default() -> Self {
        BuildOptions {
            title: None,
            codepage: DEFAULT_CODEPAGE,
        }
    }
}

/// The assembled archive bytes plus whether DICT.IDX made it into the build.
pub struct BuildReport {
    pub archive: Vec<u8>,
    pub dictionary_built: bool,
}

/// Compile the Markdown tree rooted at `input` into an in-memory AMB1
/// archive. Dictionary-build failures (`TooManyFilesPerWord`,
/// `DictionaryTooLarge`) are caught here and downgrade to "no DICT.IDX" with
/// a diagnostic on stderr, per spec.md §7; every other error aborts the run.
pub fn build_amb(input: &Path, options: &BuildOptions) -> Result<BuildReport> {
    let mut registry = CodepageRegistry::new();
    let codepage = registry.resolve(options.codepage)?;

    let articles = discovery::collect_articles(input)?;
    let rendered = render::render_articles(&articles)?;

    let mut existing_names: HashSet<String> = articles.values().map(|a| a.ama_name.clone()).collect();
    let mut sorted_articles: Vec<&Article> = articles.values().collect();
    sorted_articles.sort_by(|a, b| a.ama_name.cmp(&b.ama_name));

    let mut ama_contents: HashMap<String, Vec<String>> = HashMap::new();
    for article in sorted_articles {
        let lines = rendered.get(&article.ama_name).cloned().unwrap_or_default();
        let segments = splitter::split_article(&article.ama_name, lines, &codepage, &mut existing_names)?;
        for (name, segment_lines) in segments {
            ama_contents.insert(name, segment_lines);
        }
    }

    let mut ama_entries: Vec<ArchiveEntry> = Vec::with_capacity(ama_contents.len());
    for (name, lines) in &ama_contents {
        ama_entries.push(archive::encode_ama_entry(name, lines, &codepage)?);
    }

    let title_entry = options.title.map(archive::encode_title_entry);

    let ama_payload_refs: Vec<&[u8]> = ama_entries.iter().map(|e| e.data.as_slice()).collect();
    let unicode_map_entry = if archive::any_high_bit(&ama_payload_refs) {
        Some(ArchiveEntry {
            name: "UNICODE.MAP".to_string(),
            data: codepage.unicode_map_bytes().to_vec(),
        })
    } else {
        None
    };

    let entries_without_dict = order_entries(title_entry, ama_entries, unicode_map_entry);
    let offsets_pass1 = compute_offsets(&entries_without_dict);

    let word_index = index::build_word_index(&ama_contents);
    let (final_entries, dictionary_built) = match index::build_dict_idx(&word_index, &codepage, &offsets_pass1) {
        Ok(None) => (entries_without_dict, false),
        Ok(Some(_)) => {
            // Pass 2: adding one more directory entry shifts every payload
            // offset by a constant DIRECTORY_ENTRY_LEN; re-run the index
            // with corrected offsets (spec.md §4.E's two-pass fixed point).
            let offsets_pass2: HashMap<String, u32> = offsets_pass1
                .iter()
                .map(|(name, offset)| (name.clone(), offset + archive::DIRECTORY_ENTRY_LEN as u32))
                .collect();
            match index::build_dict_idx(&word_index, &codepage, &offsets_pass2) {
                Ok(Some(bytes)) => {
                    let mut entries = entries_without_dict;
                    entries.push(ArchiveEntry {
                        name: "DICT.IDX".to_string(),
                        data: bytes,
                    });
                    (entries, true)
                }
                Ok(None) => (entries_without_dict, false),
                Err(e) => {
                    eprintln!("mkamb: warning: dictionary index omitted: {}", e);
                    (entries_without_dict, false)
                }
            }
        }
        Err(e) => {
            eprintln!("mkamb: warning: dictionary index omitted: {}", e);
            (entries_without_dict, false)
        }
    };

    let archive_bytes = archive::pack_archive(&final_entries)?;
    Ok(BuildReport {
        archive: archive_bytes,
        dictionary_built,
    })
}

/// TITLE (optional), INDEX.AMA, remaining AMA files ascending lexicographic,
/// UNICODE.MAP (optional) — spec.md §4.F. DICT.IDX, when present, is always
/// appended last by the caller after the two-pass offset computation.
fn order_entries(
    title: Option<ArchiveEntry>,
    mut ama_entries: Vec<ArchiveEntry>,
    unicode_map: Option<ArchiveEntry>,
) -> Vec<ArchiveEntry> {
    ama_entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = Vec::with_capacity(ama_entries.len() + 3);
    if let Some(title) = title {
        out.push(title);
    }
    if let Some(pos) = ama_entries.iter().position(|e| e.name == "INDEX.AMA") {
        out.push(ama_entries.remove(pos));
    }
    out.extend(ama_entries);
    if let Some(unicode_map) = unicode_map {
        out.push(unicode_map);
    }
    out
}

fn compute_offsets(entries: &[ArchiveEntry]) -> HashMap<String, u32> {
    let mut offsets = HashMap::with_capacity(entries.len());
    let mut offset = archive::first_payload_offset(entries.len());
    for entry in entries {
        offsets.insert(entry.name.clone(), offset);
        offset += entry.data.len() as u32;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn single_ascii_article_has_no_unicode_map_or_dict_when_word_too_short() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.md");
        fs::write(&root, "# Hi").unwrap();

        let report = build_amb(&root, &BuildOptions::default()).unwrap();
        assert_eq!(&report.archive[0..4], b"AMB1");
        let entry_count = u16::from_le_bytes([report.archive[4], report.archive[5]]);
        // INDEX.AMA plus DICT.IDX (the word "hi" is indexable).
        assert_eq!(entry_count, 2);
        assert!(report.dictionary_built);
    }

    #[test]
    fn two_linked_files_produce_index_and_b() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        fs::write(&a, "[next](b.md)").unwrap();
        fs::write(&b, "content here").unwrap();

        let report = build_amb(&a, &BuildOptions::default()).unwrap();
        assert_eq!(&report.archive[0..4], b"AMB1");
    }

    #[test]
    fn non_ascii_under_cp852_emits_unicode_map() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.md");
        fs::write(&root, "slovo: č").unwrap();

        let opts = BuildOptions {
            title: None,
            codepage: "852",
        };
        let report = build_amb(&root, &opts).unwrap();
        let names = extract_directory_names(&report.archive);
        assert!(names.contains(&"UNICODE.MAP".to_string()));
    }

    fn extract_directory_names(archive: &[u8]) -> Vec<String> {
        let entry_count = u16::from_le_bytes([archive[4], archive[5]]) as usize;
        let mut names = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let start = 6 + i * archive::DIRECTORY_ENTRY_LEN;
            let raw = &archive[start..start + 12];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(12);
            names.push(String::from_utf8_lossy(&raw[..end]).to_string());
        }
        names
    }
}
