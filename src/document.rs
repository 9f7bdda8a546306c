use std::path::Path;

use crate::coerce::coerce;
use crate::error::Error;
use crate::model::{Binding, Document};
use crate::parser::tokenize;
use crate::syntax::detect_syntax;
use crate::value::Value;

/// Parse a typed `.env` document from a file.
pub fn parse(path: impl AsRef<Path>) -> Result<Document, Error> {
    let contents = std::fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse a typed `.env` document from UTF-8 text.
///
/// The directive is detected once over the whole document. With a recognized
/// directive, every binding's raw right-hand side is recovered from its
/// source statement and coerced; without one, values stay as the tokenizer's
/// unescaped strings (plain mode never invokes coercion, so its unescaping
/// rules apply untouched). A single uncoercible binding fails the whole
/// parse; there is no partial result.
pub fn parse_str(contents: &str) -> Result<Document, Error> {
    let tag = detect_syntax(contents);
    let bindings = tokenize(contents)?;

    let mut document = Document::with_capacity(bindings.len());
    for binding in bindings {
        let value = match tag {
            Some(tag) => {
                let raw = raw_value(&binding);
                coerce(&raw, tag).map_err(|err| err.for_line(&binding.original))?
            }
            None => Value::String(binding.value),
        };
        document.insert(binding.key, value);
    }

    Ok(document)
}

/// Recover the unprocessed right-hand side of a binding from its source
/// statement.
///
/// The tokenizer's `value` is unescaped for plain-string use and would
/// corrupt e.g. YAML flow syntax or JSON string quoting, so typed coercion
/// starts from the statement text instead: everything after the first `=`
/// (values may themselves contain `=`), with only leading whitespace
/// stripped.
fn raw_value(binding: &Binding) -> String {
    binding
        .original
        .split_once('=')
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or_default()
        .to_owned()
}
