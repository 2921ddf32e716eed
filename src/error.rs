//! Error types for the AMB book compiler

use std::fmt;
use std::path::PathBuf;

/// Result type alias for mkamb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during discovery, rendering, splitting,
/// indexing or packing of an AMB book
#[derive(Debug)]
pub enum Error {
    /// A link target discovered during BFS does not exist on disk
    ReferencedFileMissing { path: PathBuf },

    /// The requested codepage name has no known encoder
    UnsupportedCodepage { name: String },

    /// The requested codepage is a real codepage but is not single-byte
    NonSingleByteCodepage { name: String },

    /// A character could not be represented under the active codepage.
    /// `offset` is the byte offset of the offending character within the
    /// string passed to `CodepageInfo::encode` (spec.md §4.A: `{codepage,
    /// offset}`).
    UnencodableCharacter {
        codepage: String,
        offset: usize,
        article: Option<String>,
        line_no: Option<usize>,
    },

    /// A single AMA line by itself exceeds AMA_MAX_BYTES
    LineTooLarge { article: String, line_no: usize },

    /// An encoded AMA article exceeds AMA_MAX_BYTES
    ArticleTooLarge { article: String },

    /// An AMA article contains a tab character
    TabInArticle { article: String },

    /// A directory-entry filename does not fit the 8.3 / 12-byte field
    InvalidFilename { name: String },

    /// The splitter could not produce a segment within size limits
    SplitInfeasible { article: String },

    /// A word appears in more than 255 files; caught at build_amb boundary
    TooManyFilesPerWord { word: String },

    /// DICT.IDX exceeded the 65,536-byte body limit; caught at build_amb boundary
    DictionaryTooLarge,

    /// Filesystem I/O failure outside the discovery/render contracts
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ReferencedFileMissing { path } => {
                write!(f, "referenced file '{}' was not found", path.display())
            }
            Error::UnsupportedCodepage { name } => {
                write!(f, "unsupported codepage '{}'", name)
            }
            Error::NonSingleByteCodepage { name } => {
                write!(f, "codepage '{}' is not a single-byte encoding", name)
            }
            Error::UnencodableCharacter {
                codepage,
                offset,
                article,
                line_no,
            } => {
                write!(
                    f,
                    "character at byte offset {} not representable in codepage '{}'",
                    offset, codepage
                )?;
                if let Some(article) = article {
                    write!(f, " (article {}", article)?;
                    if let Some(line_no) = line_no {
                        write!(f, ", line {}", line_no)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            Error::LineTooLarge { article, line_no } => write!(
                f,
                "article '{}' contains a line exceeding the AMA size limit at line {}",
                article, line_no
            ),
            Error::ArticleTooLarge { article } => {
                write!(f, "article '{}' exceeds the AMA size limit", article)
            }
            Error::TabInArticle { article } => {
                write!(f, "article '{}' contains a tab character", article)
            }
            Error::InvalidFilename { name } => {
                write!(f, "filename '{}' does not fit 8.3 constraints", name)
            }
            Error::SplitInfeasible { article } => {
                write!(f, "unable to split article '{}' within size constraints", article)
            }
            Error::TooManyFilesPerWord { word } => {
                write!(f, "word '{}' appears in more than 255 files", word)
            }
            Error::DictionaryTooLarge => write!(f, "dictionary index exceeds 65,536 bytes"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
