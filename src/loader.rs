use std::path::Path;

use serde::de::{self, DeserializeOwned};

use crate::coerce::{self, coerce};
use crate::document;
use crate::error::Error;
use crate::model::Document;
use crate::syntax::SyntaxTag;

/// Load a typed `.env` document from a path.
///
/// Fails with [`Error::FileNotFound`] before any parsing if the path does
/// not resolve to an existing file.
pub fn load(path: impl AsRef<Path>) -> Result<Document, Error> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    document::parse(path)
}

/// Load a typed `.env` document and bind it into a schema type by field
/// name.
///
/// Type mismatches surface as [`Error::Schema`] with serde's own report.
pub fn load_into<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Error> {
    let document = load(path)?;
    Ok(serde_json::from_value(document_json(document))?)
}

/// Read a schema type directly from the process environment instead of a
/// file.
///
/// One environment variable is read per struct field, by exact field name,
/// and every value is coerced as `yaml 1.2` regardless of any directive:
/// there is no file to carry one. This is a deliberate divergence from
/// file-based parsing, which defaults to plain-string mode without a
/// directive.
pub fn load_env<T: DeserializeOwned>() -> Result<T, Error> {
    // Checked up front so a compiled-out YAML engine is still reported as
    // MissingBackend rather than a schema error.
    coerce::backend_available(SyntaxTag::Yaml12)?;
    Ok(T::deserialize(EnvSource)?)
}

fn document_json(document: Document) -> serde_json::Value {
    serde_json::Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect(),
    )
}

/// Resolves struct fields from environment variables, then hands the
/// collected map to serde_json for the actual visiting.
struct EnvSource;

impl<'de> de::Deserializer<'de> for EnvSource {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        Err(de::Error::custom(
            "reading from the environment requires a struct target",
        ))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let mut map = serde_json::Map::with_capacity(fields.len());
        for &field in fields {
            let raw = std::env::var(field).map_err(|_| {
                de::Error::custom(format!("environment variable `{field}` is not set"))
            })?;
            let value = coerce(&raw, SyntaxTag::Yaml12).map_err(de::Error::custom)?;
            map.insert(field.to_owned(), value.into_json());
        }

        use serde::Deserializer as _;
        serde_json::Value::Object(map).deserialize_any(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
