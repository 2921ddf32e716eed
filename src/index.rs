//! Component E: word extraction over post-split AMA content and
//! construction of the DICT.IDX full-text index.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codepage::CodepageInfo;
use crate::error::{Error, Result};

pub const WORD_MIN: usize = 2;
pub const WORD_MAX: usize = 17;

static LINK_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%l[^:]+:").unwrap());

/// Extract the set of indexable words from one article's post-split AMA
/// lines: strip control sequences, scan maximal alphanumeric runs, lowercase,
/// keep only those within [`WORD_MIN`, `WORD_MAX`] code points.
pub fn extract_words(lines: &[String]) -> HashSet<String> {
    let mut words = HashSet::new();
    for line in lines {
        let stripped = strip_control_sequences(line);
        let mut current = String::new();
        for ch in stripped.chars() {
            if ch.is_alphanumeric() {
                current.push(ch);
            } else if !current.is_empty() {
                push_word(&mut words, &current);
                current.clear();
            }
        }
        if !current.is_empty() {
            push_word(&mut words, &current);
        }
    }
    words
}

fn push_word(words: &mut HashSet<String>, raw: &str) {
    let len = raw.chars().count();
    if (WORD_MIN..=WORD_MAX).contains(&len) {
        words.insert(raw.to_lowercase());
    }
}

fn strip_control_sequences(line: &str) -> String {
    let without_links = LINK_PREFIX_RE.replace_all(line, "");
    without_links
        .replace("%t", "")
        .replace("%!", "")
        .replace("%b", "")
        .replace("%h", "")
        .replace("%%", "%")
}

/// Invert per-article word sets into `word -> set<AMA filename>`.
pub fn build_word_index(ama_contents: &HashMap<String, Vec<String>>) -> HashMap<String, BTreeSet<String>> {
    let mut index: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (filename, lines) in ama_contents {
        for word in extract_words(lines) {
            index.entry(word).or_default().insert(filename.clone());
        }
    }
    index
}

/// `((encoded_len - 2) << 4) | (XOR of (byte & 0x0F) over the encoded word)`.
pub fn bucket_id(encoded_word: &[u8]) -> u8 {
    let len = encoded_word.len() as u8;
    let xor = encoded_word.iter().fold(0u8, |acc, b| acc ^ (b & 0x0F));
    ((len.wrapping_sub(2)) << 4) | xor
}

/// Build the DICT.IDX body given `offsets`, the archive offset of every AMA
/// file present in `ama_contents`. Returns `Ok(None)` when there's nothing
/// indexable. `TooManyFilesPerWord`/`DictionaryTooLarge` are the two errors
/// `build_amb` catches and downgrades to "omit the index" (spec.md §7).
pub fn build_dict_idx(
    word_index: &HashMap<String, BTreeSet<String>>,
    codepage: &CodepageInfo,
    offsets: &HashMap<String, u32>,
) -> Result<Option<Vec<u8>>> {
    if word_index.is_empty() {
        return Ok(None);
    }

    let mut buckets: Vec<Vec<(Vec<u8>, Vec<u32>)>> = vec![Vec::new(); 256];
    let mut words: Vec<&String> = word_index.keys().collect();
    words.sort();

    for word in words {
        let char_len = word.chars().count();
        if !(WORD_MIN..=WORD_MAX).contains(&char_len) {
            continue;
        }
        let encoded = match codepage.encode(word) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        if !(WORD_MIN..=WORD_MAX).contains(&encoded.len()) {
            continue;
        }

        let files = &word_index[word];
        if files.len() > 255 {
            return Err(Error::TooManyFilesPerWord { word: word.clone() });
        }
        let mut file_offsets: Vec<u32> = files.iter().filter_map(|f| offsets.get(f).copied()).collect();
        file_offsets.sort_unstable();
        file_offsets.dedup();

        buckets[bucket_id(&encoded) as usize].push((encoded, file_offsets));
    }

    if buckets.iter().all(Vec::is_empty) {
        return Ok(None);
    }

    let mut bodies: Vec<u8> = Vec::new();
    let mut bucket_offsets = [0u16; 256];
    for (i, bucket) in buckets.iter().enumerate() {
        if bodies.len() > u16::MAX as usize {
            return Err(Error::DictionaryTooLarge);
        }
        bucket_offsets[i] = bodies.len() as u16;

        let count = bucket.len() as u16;
        bodies.extend_from_slice(&count.to_le_bytes());
        for (encoded, file_offsets) in bucket {
            bodies.extend_from_slice(encoded);
            bodies.push(file_offsets.len() as u8);
            for offset in file_offsets {
                bodies.extend_from_slice(&offset.to_le_bytes());
            }
        }
    }

    let mut out = bodies;
    for offset in bucket_offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    if out.len() > u16::MAX as usize {
        return Err(Error::DictionaryTooLarge);
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codepage::CodepageRegistry;

    #[test]
    fn extracts_lowercase_words_within_length_bounds() {
        let lines = vec!["Hello World, a.".to_string()];
        let words = extract_words(&lines);
        assert!(words.contains("hello"));
        assert!(words.contains("world"));
        assert!(!words.contains("a")); // below WORD_MIN
    }

    #[test]
    fn strips_control_sequences_before_scanning() {
        let lines = vec!["%lB.AMA:next%t more text".to_string()];
        let words = extract_words(&lines);
        assert!(!words.contains("lbama")); // the link target must not leak in
        assert!(words.contains("next"));
        assert!(words.contains("more"));
        assert!(words.contains("text"));
    }

    #[test]
    fn percent_escape_collapses() {
        let lines = vec!["100%% off sale".to_string()];
        let words = extract_words(&lines);
        assert!(words.contains("off"));
        assert!(words.contains("sale"));
    }

    #[test]
    fn bucket_formula_matches_spec_example() {
        // "hi": encoded [0x68, 0x69], bucket = ((2-2)<<4)|((0x68^0x69)&0x0F) = 0x01
        assert_eq!(bucket_id(&[0x68, 0x69]), 0x01);
    }

    #[test]
    fn dict_idx_roundtrips_bucket_and_offsets() {
        let mut reg = CodepageRegistry::new();
        let cp = reg.resolve("437").unwrap();

        let mut ama_contents = HashMap::new();
        ama_contents.insert("INDEX.AMA".to_string(), vec!["Hi there".to_string()]);
        let word_index = build_word_index(&ama_contents);

        let mut offsets = HashMap::new();
        offsets.insert("INDEX.AMA".to_string(), 42u32);

        let idx = build_dict_idx(&word_index, &cp, &offsets).unwrap().unwrap();
        assert!(idx.len() < 65_536);

        // hash table is the last 512 bytes
        let hash_table = &idx[idx.len() - 512..];
        let bucket = bucket_id(b"hi") as usize;
        let bucket_offset =
            u16::from_le_bytes([hash_table[bucket * 2], hash_table[bucket * 2 + 1]]) as usize;
        let count = u16::from_le_bytes([idx[bucket_offset], idx[bucket_offset + 1]]);
        assert_eq!(count, 1);
        let word_bytes = &idx[bucket_offset + 2..bucket_offset + 4];
        assert_eq!(word_bytes, b"hi");
        let file_count = idx[bucket_offset + 4];
        assert_eq!(file_count, 1);
        let file_offset = u32::from_le_bytes([
            idx[bucket_offset + 5],
            idx[bucket_offset + 6],
            idx[bucket_offset + 7],
            idx[bucket_offset + 8],
        ]);
        assert_eq!(file_offset, 42);
    }

    #[test]
    fn too_many_files_per_word_is_an_error() {
        let mut reg = CodepageRegistry::new();
        let cp = reg.resolve("437").unwrap();

        let mut files = BTreeSet::new();
        for i in 0..300 {
            files.insert(format!("F{:03}.AMA", i));
        }
        let mut word_index = HashMap::new();
        word_index.insert("overused".to_string(), files);
        let offsets: HashMap<String, u32> = HashMap::new();

        let err = build_dict_idx(&word_index, &cp, &offsets).unwrap_err();
        assert!(matches!(err, Error::TooManyFilesPerWord { .. }));
    }

    #[test]
    fn oversize_dict_body_is_a_dictionary_too_large_error() {
        // Bucket bodies alone can sit just under 65,536 while the 512-byte
        // hash table still pushes the whole payload past the u16 length
        // field pack_archive relies on; build_dict_idx must catch this
        // itself rather than let an oversize Vec reach the packer.
        let mut reg = CodepageRegistry::new();
        let cp = reg.resolve("437").unwrap();

        let mut word_index = HashMap::new();
        let mut offsets = HashMap::new();
        offsets.insert("A.AMA".to_string(), 0u32);
        // Enough distinct 17-byte words (22 encoded bytes each) that the
        // bucket bodies alone approach 65,536; adding the 512-byte hash
        // table on top must still be caught as DictionaryTooLarge rather
        // than silently returned as an oversize Vec.
        for i in 0..3000u32 {
            let word = format!("w{:016}", i);
            let mut files = BTreeSet::new();
            files.insert("A.AMA".to_string());
            word_index.insert(word, files);
        }

        let err = build_dict_idx(&word_index, &cp, &offsets).unwrap_err();
        assert!(matches!(err, Error::DictionaryTooLarge));
    }
}
