//! Generic parameters functions
//!
//! Parameter files are TOML documents stored in the `params` directory under
//! the software root. A single file may hold the parameters for several
//! modules, each in its own table keyed by the module name, for example:
//!
//! ```toml
//! [speed_ctrl]
//! k_p = 0.6
//!
//! [steer_ctrl]
//! k_p = 1.2
//! ```
//!
//! Files are read with `toml` and deserialised straight into each module's
//! parameter struct. Writing back goes through `toml_edit` so that the
//! layout and comments of hand-maintained files survive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{read_to_string, write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;
use toml_edit::{Document, Item};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading or saving of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (VEH_CTRL_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),

    #[error("The parameter file does not contain a [{0}] table")]
    MissingSection(String),

    #[error("Cannot parse the parameter file for editing: {0}")]
    EditParseError(toml_edit::TomlError),

    #[error("Cannot serialise the parameters: {0}")]
    SerialiseError(toml_edit::ser::Error),

    #[error("Cannot write the parameter file: {0}")]
    FileWriteError(std::io::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the full path of a parameter file.
///
/// The file path is relative to the "params" directory of the software root.
pub fn resolve(param_file_path: &str) -> Result<PathBuf, LoadError> {
    let mut path = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    Ok(path)
}

/// Load a single module's table from a parameter file.
///
/// The file path is relative to the "params" directory
pub fn load_section<P>(param_file_path: &str, section: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    load_section_from_path(resolve(param_file_path)?, section)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>
{
    // Load the file into a string
    let params_str = match read_to_string(path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(e))
    };

    // Parse the string into the parameter struct
    match toml::from_str(params_str.as_str()) {
        Ok(p) => Ok(p),
        Err(e) => Err(LoadError::DeserialiseError(e))
    }
}

/// Load a single module's table from a parameter file at an explicit path.
pub fn load_section_from_path<P, F>(path: F, section: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>
{
    let doc: toml::Value = load_from_path(path)?;

    let table = doc
        .get(section)
        .filter(|v| v.is_table())
        .cloned()
        .ok_or_else(|| LoadError::MissingSection(section.into()))?;

    table.try_into().map_err(LoadError::DeserialiseError)
}

/// Overwrite some of the values in a module's table.
///
/// Every field of `fields` is written into the `[section]` table of the file,
/// replacing existing keys of the same name and keeping their position and
/// any comment on the same line. Fields which are not in the table yet are
/// appended to it. Everything else in the file is left as it was.
pub fn update_section<S, F>(path: F, section: &str, fields: &S) -> Result<(), LoadError>
where
    S: Serialize,
    F: AsRef<Path>
{
    let doc_str = read_to_string(path.as_ref())
        .map_err(LoadError::FileLoadError)?;
    let mut doc = doc_str.parse::<Document>()
        .map_err(LoadError::EditParseError)?;

    let new_fields = toml_edit::ser::to_document(fields)
        .map_err(LoadError::SerialiseError)?;

    let table = doc
        .get_mut(section)
        .and_then(|i| i.as_table_like_mut())
        .ok_or_else(|| LoadError::MissingSection(section.into()))?;

    for (key, new_item) in new_fields.iter() {
        let new_value = match new_item.as_value() {
            Some(v) => v.clone(),
            None => {
                table.insert(key, new_item.clone());
                continue;
            }
        };

        match table.get_mut(key).and_then(|i| i.as_value_mut()) {
            Some(old_value) => {
                let decor = old_value.decor().clone();
                *old_value = new_value;
                *old_value.decor_mut() = decor;
            },
            None => {
                table.insert(key, Item::Value(new_value));
            }
        }
    }

    write(path, doc.to_string()).map_err(LoadError::FileWriteError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Section {
        a: f64,
        b: String,
    }

    #[derive(Serialize)]
    struct OnlyA {
        a: f64,
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("util_params_{}_{}.toml", name, std::process::id()));
        write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_section() {
        let path = temp_file(
            "load_section",
            "[first]\na = 1.5\nb = \"one\"\n\n[second]\na = 2.0\nb = \"two\"\n"
        );

        let second: Section = load_section_from_path(&path, "second").unwrap();
        assert_eq!(second, Section { a: 2.0, b: "two".into() });

        match load_section_from_path::<Section, _>(&path, "third") {
            Err(LoadError::MissingSection(s)) => assert_eq!(s, "third"),
            r => panic!("Expected a missing section error, got {:?}", r)
        }

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_malformed_section() {
        let path = temp_file("malformed", "[first]\na = \"not a number\"\nb = \"one\"\n");

        assert!(matches!(
            load_section_from_path::<Section, _>(&path, "first"),
            Err(LoadError::DeserialiseError(_))
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_update_section_preserves_other_keys() {
        let path = temp_file(
            "update_section",
            "[first]\na = 1.5\nb = \"one\"\n\n[second]\na = 2.0\nb = \"two\"\n"
        );

        update_section(&path, "first", &OnlyA { a: 9.0 }).unwrap();

        let first: Section = load_section_from_path(&path, "first").unwrap();
        let second: Section = load_section_from_path(&path, "second").unwrap();
        assert_eq!(first, Section { a: 9.0, b: "one".into() });
        assert_eq!(second, Section { a: 2.0, b: "two".into() });

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_update_section_keeps_layout() {
        let path = temp_file(
            "update_layout",
            "# Tuned on the test track\n\
            [second]\n\
            b = \"two\"\n\
            a = 2.0\n\
            \n\
            [first]\n\
            b = \"one\"\n\
            a = 1.5 # proportional\n\
            \n\
            [manual]\n\
            throttle = { m = 1.5, b = 0.0 }\n"
        );

        update_section(&path, "first", &OnlyA { a: 9.0 }).unwrap();

        let contents = read_to_string(&path).unwrap();

        assert!(contents.starts_with("# Tuned on the test track\n[second]\n"));
        assert!(contents.contains("a = 9.0 # proportional\n"));
        assert!(contents.contains("throttle = { m = 1.5, b = 0.0 }"));
        assert!(!contents.contains("[manual.throttle]"));

        // Tables and keys keep their order
        assert!(contents.find("[second]") < contents.find("[first]"));
        assert!(contents.find("b = \"one\"") < contents.find("a = 9.0"));

        let first: Section = load_section_from_path(&path, "first").unwrap();
        assert_eq!(first, Section { a: 9.0, b: "one".into() });

        // Missing tables are not created
        assert!(matches!(
            update_section(&path, "third", &OnlyA { a: 1.0 }),
            Err(LoadError::MissingSection(_))
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let mut path = std::env::temp_dir();
        path.push("util_params_does_not_exist.toml");

        assert!(matches!(
            load_from_path::<toml::Value, _>(&path),
            Err(LoadError::FileLoadError(_))
        ));
    }
}
