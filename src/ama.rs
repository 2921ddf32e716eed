//! Shared AMA payload assembly: joining rendered lines into the final
//! newline-terminated text and encoding it through a codepage. Used by both
//! the splitter (to measure candidate segment sizes) and the archive packer
//! (to produce the bytes that actually get written).

use crate::codepage::CodepageInfo;
use crate::error::{Error, Result};

pub const AMA_MAX_BYTES: usize = 65_535;

/// Join `lines` with `\n`, strip any trailing empty lines, and append a
/// single terminating `\n` (spec.md §3).
pub fn join_payload(lines: &[String]) -> String {
    let mut joined = lines.join("\n");
    while joined.ends_with('\n') {
        joined.pop();
    }
    joined.push('\n');
    joined
}

/// Encode the joined payload through `codepage`, attributing any
/// unencodable character to `article`.
pub fn encode_payload(lines: &[String], codepage: &CodepageInfo, article: &str) -> Result<Vec<u8>> {
    let joined = join_payload(lines);
    codepage.encode(&joined).map_err(|e| attribute(e, article))
}

/// Encode a single line (no trailing newline) through `codepage`,
/// attributing any unencodable character to `article`/`line_no`.
pub fn encode_line(line: &str, codepage: &CodepageInfo, article: &str, line_no: usize) -> Result<Vec<u8>> {
    codepage
        .encode(line)
        .map_err(|e| attribute_with_line(e, article, line_no))
}

fn attribute(err: Error, article: &str) -> Error {
    match err {
        Error::UnencodableCharacter { codepage, offset, .. } => Error::UnencodableCharacter {
            codepage,
            offset,
            article: Some(article.to_string()),
            line_no: None,
        },
        other => other,
    }
}

fn attribute_with_line(err: Error, article: &str, line_no: usize) -> Error {
    match err {
        Error::UnencodableCharacter { codepage, offset, .. } => Error::UnencodableCharacter {
            codepage,
            offset,
            article: Some(article.to_string()),
            line_no: Some(line_no),
        },
        other => other,
    }
}
