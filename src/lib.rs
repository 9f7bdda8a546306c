//! Parse `.env` files whose values are written in an embedded data syntax.
//!
//! A single directive comment selects the value syntax for the whole
//! document:
//!
//! ```text
//! # values: yaml 1.2
//! PORT=8080
//! FLAGS=[fast, safe]
//! ```
//!
//! [`parse`] and [`load`] return a typed [`Document`]; [`load_into`] binds
//! the document into any `serde`-deserializable struct, and [`load_env`]
//! reads struct fields straight from the process environment. Without a
//! directive, or with an unrecognized one, values stay plain strings with
//! conventional dotenv unescaping.
//!
//! The `yaml` and `toml` cargo features (both on by default) enable the
//! corresponding engines; a document declaring a compiled-out syntax fails
//! with [`CoerceError::MissingBackend`].
//!
//! `# values: python-unsafe` evaluates full expressions; a document source
//! opting into it is trusted by definition.

mod coerce;
mod document;
mod error;
mod loader;
mod model;
mod parser;
mod pyexpr;
mod syntax;
mod value;

pub use coerce::coerce;
pub use document::{parse, parse_str};
pub use error::{CoerceError, Error, ParseError, ParseErrorKind};
pub use loader::{load, load_env, load_into};
pub use model::{Binding, Document};
pub use parser::tokenize;
pub use syntax::{DIRECTIVE_PREFIX, SyntaxTag, detect_syntax};
pub use value::{Date, Datetime, Offset, Time, Value};
