use std::path::PathBuf;

use thiserror::Error;

use crate::syntax::SyntaxTag;

/// Top-level error for parsing and loading typed `.env` documents.
#[derive(Debug, Error)]
pub enum Error {
    /// The source path did not resolve to an existing file.
    #[error("file {0:?} was not found")]
    FileNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The dotenv line grammar itself was violated.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A value could not be coerced under the document's declared syntax.
    #[error(transparent)]
    Coerce(#[from] CoerceError),
    /// The parsed document did not fit the target schema type.
    #[error("schema binding failed: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Error raised by the dotenv line tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: u32, column: u32, kind: ParseErrorKind) -> Self {
        Self { line, column, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid syntax")]
    InvalidSyntax,
    #[error("missing key")]
    MissingKey,
    #[error("invalid key")]
    InvalidKey,
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Error raised while coercing a raw value under a declared syntax.
///
/// `MissingBackend` and `Syntax` are deliberately distinct: a compiled-out
/// engine is never reported as a malformed value, and neither case downgrades
/// the document to plain-string mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error(
        "cannot parse `# values: {tag}` values: \
         build with the `{feature}` cargo feature enabled"
    )]
    MissingBackend {
        tag: SyntaxTag,
        feature: &'static str,
    },
    /// The underlying engine rejected the value. `message` preserves the
    /// engine's own report, including any position information.
    #[error("error while parsing {line:?} as {tag}: {message}")]
    Syntax {
        tag: SyntaxTag,
        line: String,
        message: String,
    },
}

impl CoerceError {
    /// Replace the reported line with the offending source statement.
    pub(crate) fn for_line(self, original: &str) -> Self {
        match self {
            Self::Syntax { tag, message, .. } => Self::Syntax {
                tag,
                line: original.to_owned(),
                message,
            },
            other => other,
        }
    }
}
