use std::fmt::{Display, Formatter};

/// Prefix of the directive comment that selects a value syntax for a
/// whole document.
pub const DIRECTIVE_PREFIX: &str = "# values: ";

/// The value syntax declared by a `# values: <tag>` directive.
///
/// Plain-string mode is the absence of a tag (`Option<SyntaxTag>` = `None`),
/// not a variant: a document without a directive, or with an unrecognized
/// one, keeps the tokenizer's unescaped strings as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxTag {
    /// `# values: python` — restricted Python literals.
    PythonLiteral,
    /// `# values: python-unsafe` — full Python-style expression evaluation.
    PythonEval,
    /// `# values: yaml 1.1`
    Yaml11,
    /// `# values: yaml 1.2`
    Yaml12,
    /// `# values: toml`
    Toml,
    /// `# values: json`
    Json,
}

impl SyntaxTag {
    /// The canonical directive text for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PythonLiteral => "python",
            Self::PythonEval => "python-unsafe",
            Self::Yaml11 => "yaml 1.1",
            Self::Yaml12 => "yaml 1.2",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn from_tag_text(text: &str) -> Option<Self> {
        match text {
            "python" => Some(Self::PythonLiteral),
            "python-unsafe" => Some(Self::PythonEval),
            "yaml 1.1" => Some(Self::Yaml11),
            "yaml 1.2" => Some(Self::Yaml12),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Display for SyntaxTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan a document for its value-syntax directive.
///
/// Only the first line starting with `# values: ` is considered. If its
/// trailing text is not a known tag the document degrades to plain-string
/// mode; later directive lines never re-open the decision. This function is
/// total: it never fails, even on empty or malformed input.
pub fn detect_syntax(contents: &str) -> Option<SyntaxTag> {
    for line in contents.lines() {
        if let Some(tag_text) = line.strip_prefix(DIRECTIVE_PREFIX) {
            return SyntaxTag::from_tag_text(tag_text);
        }
    }
    None
}
