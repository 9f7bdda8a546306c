use std::path::PathBuf;
#[cfg(feature = "yaml")]
use std::sync::{Mutex, MutexGuard, OnceLock};

use serde::Deserialize;
use tempfile::TempDir;
use typed_dotenv::{CoerceError, Error, Value, load, load_env, load_into};

#[test]
fn load_parses_plain_documents_as_strings() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "STRING=String\n\
         SINGLEQUOTED='string (single-quoted)'\n\
         UNVALID-PYTHON-IDENTIFIER=True\n\
         BOOLEAN_FALSE=false\n\
         YES=yes\n\
         OFF=off\n",
    );

    let doc = load(&file).expect("load should succeed");
    assert_eq!(doc["STRING"], Value::String("String".to_owned()));
    assert_eq!(
        doc["SINGLEQUOTED"],
        Value::String("string (single-quoted)".to_owned())
    );
    // Without a directive nothing is typed, not even booleans.
    assert_eq!(
        doc["UNVALID-PYTHON-IDENTIFIER"],
        Value::String("True".to_owned())
    );
    assert_eq!(doc["BOOLEAN_FALSE"], Value::String("false".to_owned()));
    assert_eq!(doc["YES"], Value::String("yes".to_owned()));
    assert_eq!(doc["OFF"], Value::String("off".to_owned()));
}

#[cfg(feature = "yaml")]
#[test]
fn load_parses_yaml_documents() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "# values: yaml 1.2\n\
         PORT=8080\n\
         DEBUG=true\n\
         NAME=\"quoted name\"\n\
         FLAGS=[fast, safe]\n",
    );

    let doc = load(&file).expect("load should succeed");
    assert_eq!(doc["PORT"], Value::Int(8080));
    assert_eq!(doc["DEBUG"], Value::Bool(true));
    assert_eq!(doc["NAME"], Value::String("quoted name".to_owned()));
    assert_eq!(
        doc["FLAGS"],
        Value::Seq(vec![
            Value::String("fast".to_owned()),
            Value::String("safe".to_owned())
        ])
    );
}

#[cfg(feature = "toml")]
#[test]
fn load_parses_toml_documents() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "# values: toml\n\
         FLAG=true\n\
         COUNT=8593\n\
         STARTS_AT=12:34:56\n\
         LABEL=\"release\"\n",
    );

    let doc = load(&file).expect("load should succeed");
    assert_eq!(doc["FLAG"], Value::Bool(true));
    assert_eq!(doc["COUNT"], Value::Int(8593));
    let time = doc["STARTS_AT"]
        .as_datetime()
        .and_then(|dt| dt.time)
        .expect("STARTS_AT should be a local time");
    assert_eq!((time.hour, time.minute, time.second), (12, 34, 56));
    assert_eq!(doc["LABEL"], Value::String("release".to_owned()));
}

#[test]
fn load_parses_python_literal_documents() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "# values: python\n\
         FLAG=True\n\
         PAIR=(1, 2)\n\
         NAMES=['a', 'b']\n",
    );

    let doc = load(&file).expect("load should succeed");
    assert_eq!(doc["FLAG"], Value::Bool(true));
    assert_eq!(doc["PAIR"], Value::Seq(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(
        doc["NAMES"],
        Value::Seq(vec![
            Value::String("a".to_owned()),
            Value::String("b".to_owned())
        ])
    );
}

#[test]
fn load_missing_file_is_file_not_found() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let missing = dir.path().join("unexistant_file");

    let err = load(&missing).expect_err("expected FileNotFound");
    match err {
        Error::FileNotFound(path) => assert_eq!(path, missing),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn load_reports_the_offending_line_on_bad_values() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(&dir, "# values: json\nGOOD=1\nBAD=morty\n");

    let err = load(&file).expect_err("expected a coercion error");
    match err {
        Error::Coerce(CoerceError::Syntax { line, .. }) => assert_eq!(line, "BAD=morty"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(not(feature = "toml"))]
#[test]
fn load_without_toml_backend_reports_missing_backend() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(&dir, "# values: toml\nFLAG=true\n");

    let err = load(&file).expect_err("expected MissingBackend");
    match err {
        Error::Coerce(CoerceError::MissingBackend { feature, .. }) => {
            assert_eq!(feature, "toml");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct ServiceConfig {
    port: u16,
    debug: bool,
    name: String,
}

#[test]
fn load_into_binds_a_schema_struct() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "# values: json\nport=8080\ndebug=true\nname=\"api\"\n",
    );

    let config: ServiceConfig = load_into(&file).expect("load_into should succeed");
    assert_eq!(
        config,
        ServiceConfig {
            port: 8080,
            debug: true,
            name: "api".to_owned(),
        }
    );
}

#[test]
fn load_into_reports_schema_mismatch() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let file = write_env(
        &dir,
        "# values: json\nport=\"not a number\"\ndebug=true\nname=\"api\"\n",
    );

    let err = load_into::<ServiceConfig>(&file).expect_err("expected a schema error");
    match err {
        Error::Schema(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(feature = "yaml")]
#[derive(Debug, Deserialize, PartialEq)]
struct ServiceEnv {
    #[serde(rename = "TYPED_DOTENV_TEST_PORT")]
    port: u16,
    #[serde(rename = "TYPED_DOTENV_TEST_DEBUG")]
    debug: bool,
    #[serde(rename = "TYPED_DOTENV_TEST_NAME")]
    name: String,
}

#[cfg(feature = "yaml")]
#[test]
fn load_env_coerces_variables_as_yaml() {
    let _guard = env_lock();
    set_var("TYPED_DOTENV_TEST_PORT", "8080");
    set_var("TYPED_DOTENV_TEST_DEBUG", "true");
    set_var("TYPED_DOTENV_TEST_NAME", "api");

    let config: ServiceEnv = load_env().expect("load_env should succeed");
    assert_eq!(
        config,
        ServiceEnv {
            port: 8080,
            debug: true,
            name: "api".to_owned(),
        }
    );
}

#[cfg(feature = "yaml")]
#[test]
fn load_env_fails_on_missing_variable() {
    let _guard = env_lock();
    set_var("TYPED_DOTENV_TEST_PORT", "8080");
    set_var("TYPED_DOTENV_TEST_DEBUG", "true");
    remove_var("TYPED_DOTENV_TEST_NAME");

    let err = load_env::<ServiceEnv>().expect_err("expected a schema error");
    match err {
        Error::Schema(err) => {
            assert!(err.to_string().contains("TYPED_DOTENV_TEST_NAME"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(not(feature = "yaml"))]
#[test]
fn load_env_without_yaml_backend_reports_missing_backend() {
    #[derive(Debug, Deserialize)]
    struct Empty {}

    let err = load_env::<Empty>().expect_err("expected MissingBackend");
    match err {
        Error::Coerce(CoerceError::MissingBackend { feature, .. }) => {
            assert_eq!(feature, "yaml");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

fn write_env(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join(".env");
    std::fs::write(&path, contents).expect("failed to write test file");
    path
}

#[cfg(feature = "yaml")]
fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock should not be poisoned")
}

#[cfg(feature = "yaml")]
fn set_var(key: &str, value: &str) {
    // Guarded by env_lock in every caller.
    unsafe { std::env::set_var(key, value) };
}

#[cfg(feature = "yaml")]
fn remove_var(key: &str) {
    unsafe { std::env::remove_var(key) };
}
