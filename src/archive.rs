//! Component F: BSD checksums, AMA payload finalization, and packing the
//! directory + concatenated payloads into the AMB1 wire format.

use crate::ama::AMA_MAX_BYTES;
use crate::codepage::CodepageInfo;
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"AMB1";
pub const DIRECTORY_ENTRY_LEN: usize = 20;
const NAME_FIELD_LEN: usize = 12;
const TITLE_MAX_BYTES: usize = 64;

/// A single file about to be written into the archive, already paired with
/// its canonical uppercase 12-byte-or-shorter name.
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Rotate-right-by-one-within-a-16-bit-word, then add, over every byte.
pub fn bsd_checksum(data: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for &byte in data {
        sum = sum.rotate_right(1);
        sum = sum.wrapping_add(byte as u16);
    }
    sum
}

/// Finalize one AMA article's payload: reject embedded tabs, join lines with
/// `\n`, strip trailing blank lines, append one terminating `\n`, encode
/// through `codepage`, and enforce AMA_MAX_BYTES (spec.md §4.F).
pub fn encode_ama_entry(name: &str, lines: &[String], codepage: &CodepageInfo) -> Result<ArchiveEntry> {
    if lines.iter().any(|l| l.contains('\t')) {
        return Err(Error::TabInArticle {
            article: name.to_string(),
        });
    }
    let data = crate::ama::encode_payload(lines, codepage, name)?;
    if data.len() > AMA_MAX_BYTES {
        return Err(Error::ArticleTooLarge {
            article: name.to_string(),
        });
    }
    Ok(ArchiveEntry {
        name: name.to_string(),
        data,
    })
}

/// Build the optional "TITLE" entry: ASCII-encode `title` with non-ASCII
/// characters dropped, truncated to 64 bytes.
pub fn encode_title_entry(title: &str) -> ArchiveEntry {
    let mut data: Vec<u8> = title.chars().filter(|c| c.is_ascii()).map(|c| c as u8).collect();
    data.truncate(TITLE_MAX_BYTES);
    ArchiveEntry {
        name: "TITLE".to_string(),
        data,
    }
}

/// Whether any byte in an AMA payload is ≥0x80, triggering UNICODE.MAP
/// emission. Per spec.md §9's open question, TITLE is excluded from this
/// scan — only AMA payloads count.
pub fn any_high_bit(ama_payloads: &[&[u8]]) -> bool {
    ama_payloads.iter().any(|data| data.iter().any(|&b| b >= 0x80))
}

fn encode_name_field(name: &str) -> Result<[u8; NAME_FIELD_LEN]> {
    if !name.is_ascii() || name.len() > NAME_FIELD_LEN {
        return Err(Error::InvalidFilename {
            name: name.to_string(),
        });
    }
    let mut field = [0u8; NAME_FIELD_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Ok(field)
}

/// Pack `entries`, already in final directory order, into the AMB1 byte
/// stream: magic, uint16 entry count, N 20-byte directory entries, then the
/// concatenated payloads in the same order.
pub fn pack_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    if entries.len() > u16::MAX as usize {
        return Err(Error::InvalidFilename {
            name: "(archive exceeds 65,535 entries)".to_string(),
        });
    }

    let header_len = 4 + 2 + entries.len() * DIRECTORY_ENTRY_LEN;
    let mut directory = Vec::with_capacity(entries.len() * DIRECTORY_ENTRY_LEN);
    let mut payloads = Vec::new();
    let mut offset = header_len as u32;

    for entry in entries {
        if entry.data.len() > u16::MAX as usize {
            return Err(Error::ArticleTooLarge {
                article: entry.name.clone(),
            });
        }
        let name_field = encode_name_field(&entry.name)?;
        let checksum = bsd_checksum(&entry.data);

        directory.extend_from_slice(&name_field);
        directory.extend_from_slice(&offset.to_le_bytes());
        directory.extend_from_slice(&(entry.data.len() as u16).to_le_bytes());
        directory.extend_from_slice(&checksum.to_le_bytes());

        offset += entry.data.len() as u32;
        payloads.extend_from_slice(&entry.data);
    }

    let mut out = Vec::with_capacity(header_len + payloads.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&directory);
    out.extend_from_slice(&payloads);
    Ok(out)
}

/// Byte offset, from the archive's first byte, of the first payload for a
/// directory of `entry_count` entries (spec.md §8's universal property).
pub fn first_payload_offset(entry_count: usize) -> u32 {
    (4 + 2 + entry_count * DIRECTORY_ENTRY_LEN) as u32
}
