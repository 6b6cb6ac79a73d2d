//! Runtime configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::localization::DEFAULT_LANGUAGE;
use crate::storage::DEFAULT_CAPACITY;

/// Where content lives and how storage is sized.
///
/// Every field is optional in the RON source:
///
/// ```ron
/// (
///     content_dir: "assets/content",
///     language: "de-DE",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The root of the entity definition files.
    pub content_dir: PathBuf,
    /// The root of the per-language localization directories.
    pub localization_dir: PathBuf,
    pub language: String,
    /// The initial slot capacity of each component storage.
    pub storage_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            content_dir: PathBuf::from("content"),
            localization_dir: PathBuf::from("localization"),
            language: DEFAULT_LANGUAGE.to_owned(),
            storage_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Parse a configuration from RON source.
    pub fn from_str(source: &str) -> Result<Config> {
        ron::from_str(source).map_err(|err| Error::parse("<config>", err))
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        ron::from_str(&source).map_err(|err| Error::parse(path, err))
    }
}
