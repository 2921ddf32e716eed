//! Codepage registry: resolves a user-supplied codepage name to a
//! [`CodepageInfo`] pairing a total-over-ASCII-plus-mapped-high-bytes
//! encoder with the 128-entry unicode map needed to emit UNICODE.MAP.
//!
//! Mirrors `tools/mkcodepages`'s approach of keeping one 128-entry table as
//! the single source of truth and deriving the inverse (Unicode -> byte)
//! map from it, rather than maintaining encode and decode tables by hand.

mod synthetic;

use std::collections::HashMap;

use oem_cp::code_table::{
    DECODING_TABLE_CP437, DECODING_TABLE_CP775, DECODING_TABLE_CP850, DECODING_TABLE_CP852,
    DECODING_TABLE_CP857, DECODING_TABLE_CP858, DECODING_TABLE_CP866,
};

use crate::error::{Error, Result};

/// A resolved 8-bit encoding: a total-over-ASCII encoder for bytes 0x00-0x7F
/// plus a 128-entry table mapping bytes 0x80-0xFF to Unicode scalar values.
pub struct CodepageInfo {
    name: String,
    unicode_map: [u16; 128],
    encode_table: HashMap<char, u8>,
}

impl CodepageInfo {
    fn from_table(name: &str, table: [char; 128]) -> Self {
        let mut unicode_map = [0u16; 128];
        let mut encode_table = HashMap::with_capacity(128);
        for (i, &ch) in table.iter().enumerate() {
            unicode_map[i] = ch as u32 as u16;
            // First-write wins: a lower byte position keeps priority on collision.
            encode_table.entry(ch).or_insert((0x80 + i) as u8);
        }
        CodepageInfo {
            name: name.to_string(),
            unicode_map,
            encode_table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode `s` under this codepage. ASCII passes through; each other
    /// character is looked up in the high-byte table. Fails at the first
    /// unrepresentable character, reporting its byte offset in `s`.
    pub fn encode(&self, s: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(s.len());
        for (offset, ch) in s.char_indices() {
            if (ch as u32) < 0x80 {
                out.push(ch as u8);
            } else if let Some(&byte) = self.encode_table.get(&ch) {
                out.push(byte);
            } else {
                return Err(Error::UnencodableCharacter {
                    codepage: self.name.clone(),
                    offset,
                    article: None,
                    line_no: None,
                });
            }
        }
        Ok(out)
    }

    /// Serialize the unicode map as 128 little-endian uint16 values (256 bytes),
    /// the UNICODE.MAP wire format.
    pub fn unicode_map_bytes(&self) -> [u8; 256] {
        let mut bytes = [0u8; 256];
        for (i, &codepoint) in self.unicode_map.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&codepoint.to_le_bytes());
        }
        bytes
    }
}

/// Per-run memoized codepage resolver. Cheap to construct; intended to live
/// for the lifetime of one `build_amb` call (spec.md §5 permits a per-run
/// cache in place of a process-wide one).
#[derive(Default)]
pub struct CodepageRegistry {
    cache: HashMap<String, std::rc::Rc<CodepageInfo>>,
}

impl CodepageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, name: &str) -> Result<std::rc::Rc<CodepageInfo>> {
        let canonical = canonicalize(name);
        if let Some(info) = self.cache.get(&canonical) {
            return Ok(info.clone());
        }
        let info = std::rc::Rc::new(build(&canonical)?);
        self.cache.insert(canonical, info.clone());
        Ok(info)
    }
}

/// Lowercase, strip separators, apply the alias table, then the
/// `ibm|dos|windows|win<digits>` / bare-digit fallback rule (spec.md §4.A).
fn canonicalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped: String = lower.chars().filter(|c| *c != '-' && *c != '_').collect();

    let aliased = match stripped.as_str() {
        "cp437" | "ibm437" | "dos437" | "437" => Some("cp437"),
        "cp775" | "ibm775" | "775" => Some("cp775"),
        "cp808" | "808" => Some("cp808"),
        "cp850" | "ibm850" | "850" => Some("cp850"),
        "cp852" | "ibm852" | "852" => Some("cp852"),
        "cp857" | "ibm857" | "857" => Some("cp857"),
        "cp858" | "ibm858" | "858" => Some("cp858"),
        "cp866" | "ibm866" | "866" => Some("cp866"),
        "cp1250" | "windows1250" | "win1250" | "1250" => Some("cp1250"),
        "cp1252" | "windows1252" | "win1252" | "1252" => Some("cp1252"),
        "kam" | "kamenicky" => Some("kam"),
        "maz" | "mazovia" => Some("maz"),
        _ => None,
    };
    if let Some(aliased) = aliased {
        return aliased.to_string();
    }

    for prefix in ["ibm", "dos", "windows", "win"] {
        if let Some(rest) = stripped.strip_prefix(prefix) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return format!("cp{}", rest);
            }
        }
    }
    if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit()) {
        return format!("cp{}", stripped);
    }
    stripped
}

/// Windows codepages known to `encoding_rs` but not single-byte; requesting
/// one of these yields `NonSingleByteCodepage` rather than `UnsupportedCodepage`.
fn multibyte_codepage_name(canonical: &str) -> bool {
    matches!(
        canonical,
        "cp932" | "cp936" | "cp949" | "cp950" | "cp65001"
    )
}

fn build(canonical: &str) -> Result<CodepageInfo> {
    let table = match canonical {
        "cp437" => DECODING_TABLE_CP437,
        "cp775" => DECODING_TABLE_CP775,
        "cp850" => DECODING_TABLE_CP850,
        "cp852" => DECODING_TABLE_CP852,
        "cp857" => DECODING_TABLE_CP857,
        "cp858" => DECODING_TABLE_CP858,
        "cp866" => DECODING_TABLE_CP866,
        "cp808" => synthetic::cp808_table(),
        "kam" => synthetic::kam_table(),
        "maz" => synthetic::maz_table(),
        "cp1250" => decode_with_encoding_rs(encoding_rs::WINDOWS_1250, canonical)?,
        "cp1252" => decode_with_encoding_rs(encoding_rs::WINDOWS_1252, canonical)?,
        other => {
            if multibyte_codepage_name(other) {
                return Err(Error::NonSingleByteCodepage {
                    name: other.to_string(),
                });
            }
            return Err(Error::UnsupportedCodepage {
                name: other.to_string(),
            });
        }
    };
    Ok(CodepageInfo::from_table(canonical, table))
}

/// Decode bytes 0x80..=0xFF through a host codec, one byte at a time, to
/// build a 128-entry table. Fails if any byte has no defined mapping.
fn decode_with_encoding_rs(encoding: &'static encoding_rs::Encoding, name: &str) -> Result<[char; 128]> {
    let high_bytes: Vec<u8> = (0x80u16..=0xFF).map(|b| b as u8).collect();
    let (decoded, _, had_errors) = encoding.decode(&high_bytes);
    if had_errors {
        return Err(Error::UnsupportedCodepage {
            name: name.to_string(),
        });
    }
    let chars: Vec<char> = decoded.chars().collect();
    if chars.len() != 128 {
        return Err(Error::UnsupportedCodepage {
            name: name.to_string(),
        });
    }
    let mut table = ['\0'; 128];
    table.copy_from_slice(&chars);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_aliases() {
        assert_eq!(canonicalize("IBM437"), "cp437");
        assert_eq!(canonicalize("dos-437"), "cp437");
        assert_eq!(canonicalize("437"), "cp437");
        assert_eq!(canonicalize("kamenicky"), "kam");
        assert_eq!(canonicalize("Mazovia"), "maz");
        assert_eq!(canonicalize("win1252"), "cp1252");
        assert_eq!(canonicalize("windows_1250"), "cp1250");
    }

    #[test]
    fn canonicalizes_fallback_rule() {
        assert_eq!(canonicalize("ibm9999"), "cp9999");
        assert_eq!(canonicalize("9999"), "cp9999");
    }

    #[test]
    fn resolves_cp437_and_encodes_ascii() {
        let mut reg = CodepageRegistry::new();
        let cp = reg.resolve("437").unwrap();
        assert_eq!(cp.encode("Hi").unwrap(), b"Hi".to_vec());
    }

    #[test]
    fn cp808_encodes_euro_sign_to_0xfd() {
        let mut reg = CodepageRegistry::new();
        let cp = reg.resolve("cp808").unwrap();
        let bytes = cp.encode("\u{20AC}").unwrap();
        assert_eq!(bytes, vec![0xFD]);
    }

    #[test]
    fn unsupported_codepage_errors() {
        let mut reg = CodepageRegistry::new();
        assert!(matches!(
            reg.resolve("nonsense-codepage"),
            Err(Error::UnsupportedCodepage { .. })
        ));
    }

    #[test]
    fn multibyte_codepage_is_distinguished() {
        let mut reg = CodepageRegistry::new();
        assert!(matches!(
            reg.resolve("cp932"),
            Err(Error::NonSingleByteCodepage { .. })
        ));
    }

    #[test]
    fn memoizes_within_a_registry() {
        let mut reg = CodepageRegistry::new();
        let a = reg.resolve("437").unwrap();
        let b = reg.resolve("437").unwrap();
        assert!(std::rc::Rc::ptr_eq(&a, &b));
    }
}
