//! Coercion dispatch: route a raw value to the engine for its declared
//! syntax.
//!
//! Each syntax is backed by an engine function. The YAML and TOML engines
//! sit behind cargo features; looking one up while its feature is compiled
//! out yields [`CoerceError::MissingBackend`] rather than a silent downgrade
//! to plain-string mode. Because [`SyntaxTag`] is a closed enum matched
//! exhaustively here, every syntax has defined behavior by construction.

use crate::error::CoerceError;
use crate::pyexpr;
use crate::syntax::SyntaxTag;
use crate::value::Value;

type EngineFn = fn(&str) -> Result<Value, String>;

fn engine_for(tag: SyntaxTag) -> Result<EngineFn, CoerceError> {
    match tag {
        // Both YAML dialects share one engine; the original behavior never
        // pinned a version either.
        SyntaxTag::Yaml11 | SyntaxTag::Yaml12 => {
            #[cfg(feature = "yaml")]
            {
                Ok(parse_yaml as EngineFn)
            }
            #[cfg(not(feature = "yaml"))]
            {
                Err(CoerceError::MissingBackend {
                    tag,
                    feature: "yaml",
                })
            }
        }
        SyntaxTag::Toml => {
            #[cfg(feature = "toml")]
            {
                Ok(parse_toml as EngineFn)
            }
            #[cfg(not(feature = "toml"))]
            {
                Err(CoerceError::MissingBackend {
                    tag,
                    feature: "toml",
                })
            }
        }
        SyntaxTag::Json => Ok(parse_json),
        SyntaxTag::PythonLiteral => Ok(parse_python_literal),
        SyntaxTag::PythonEval => Ok(parse_python_eval),
    }
}

/// Check that the engine for `tag` is compiled in.
pub(crate) fn backend_available(tag: SyntaxTag) -> Result<(), CoerceError> {
    engine_for(tag).map(|_| ())
}

/// Coerce a raw right-hand side into a typed value under the given syntax.
///
/// The reported error carries the raw text; callers that know the full
/// source statement re-attach it afterwards.
pub fn coerce(raw: &str, tag: SyntaxTag) -> Result<Value, CoerceError> {
    let engine = engine_for(tag)?;
    engine(raw).map_err(|message| CoerceError::Syntax {
        tag,
        line: raw.to_owned(),
        message,
    })
}

#[cfg(feature = "yaml")]
fn parse_yaml(raw: &str) -> Result<Value, String> {
    // serde_yaml only resolves scalars and collections; there is no
    // arbitrary object construction to guard against.
    let doc: serde_yaml::Value =
        serde_yaml::from_str(&format!("v: {raw}")).map_err(|e| e.to_string())?;
    let serde_yaml::Value::Mapping(map) = doc else {
        return Err("value did not parse as a YAML mapping entry".to_owned());
    };
    let entry = map
        .into_iter()
        .find_map(|(key, value)| (key.as_str() == Some("v")).then_some(value))
        .unwrap_or(serde_yaml::Value::Null);
    from_yaml(entry)
}

#[cfg(feature = "yaml")]
fn from_yaml(value: serde_yaml::Value) -> Result<Value, String> {
    match value {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(format!("unrepresentable YAML number {n}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s)),
        serde_yaml::Value::Sequence(seq) => Ok(Value::Seq(
            seq.into_iter().map(from_yaml).collect::<Result<_, _>>()?,
        )),
        serde_yaml::Value::Mapping(map) => {
            let mut out = indexmap::IndexMap::with_capacity(map.len());
            for (key, value) in map {
                out.insert(yaml_key(key)?, from_yaml(value)?);
            }
            Ok(Value::Map(out))
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

#[cfg(feature = "yaml")]
fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_owned()),
        other => Err(format!("unsupported YAML mapping key {other:?}")),
    }
}

#[cfg(feature = "toml")]
fn parse_toml(raw: &str) -> Result<Value, String> {
    // The toml error display already includes the reported position.
    let mut table: toml::Table = format!("v = {raw}").parse().map_err(|e: toml::de::Error| e.to_string())?;
    let entry = table
        .remove("v")
        .ok_or_else(|| "value did not parse as a TOML entry".to_owned())?;
    Ok(from_toml(entry))
}

#[cfg(feature = "toml")]
fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::Datetime(from_toml_datetime(dt)),
        toml::Value::Array(arr) => Value::Seq(arr.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::Map(
            table
                .into_iter()
                .map(|(key, value)| (key, from_toml(value)))
                .collect(),
        ),
    }
}

#[cfg(feature = "toml")]
fn from_toml_datetime(dt: toml::value::Datetime) -> crate::value::Datetime {
    use crate::value::{Date, Datetime, Offset, Time};

    Datetime {
        date: dt.date.map(|date| Date {
            year: date.year,
            month: date.month,
            day: date.day,
        }),
        time: dt.time.map(|time| Time {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            nanosecond: time.nanosecond,
        }),
        offset: dt.offset.map(|offset| match offset {
            toml::value::Offset::Z => Offset::Z,
            toml::value::Offset::Custom { minutes } => Offset::Custom { minutes },
        }),
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    // The serde_json error display already includes line and column.
    let doc: serde_json::Value =
        serde_json::from_str(&format!("{{\"v\": {raw}}}")).map_err(|e| e.to_string())?;
    let serde_json::Value::Object(mut map) = doc else {
        return Err("value did not parse as a JSON object entry".to_owned());
    };
    Ok(from_json(map.remove("v").unwrap_or(serde_json::Value::Null)))
}

fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Seq(arr.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect(),
        ),
    }
}

fn parse_python_literal(raw: &str) -> Result<Value, String> {
    pyexpr::parse_literal(raw).map_err(|e| e.to_string())
}

fn parse_python_eval(raw: &str) -> Result<Value, String> {
    pyexpr::eval_expr(raw).map_err(|e| e.to_string())
}
