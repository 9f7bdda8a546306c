use indexmap::IndexMap;

use crate::value::Value;

/// A parsed `KEY=VALUE` binding from a `.env` file or input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: String,
    /// The value after conventional dotenv unescaping (quotes removed,
    /// escapes resolved, inline comment stripped).
    pub value: String,
    /// The verbatim source statement this binding came from, used to recover
    /// the untouched right-hand side for typed coercion.
    pub original: String,
    pub line: u32,
}

/// A fully coerced document: keys in file order, duplicates resolved to the
/// last assignment.
pub type Document = IndexMap<String, Value>;
