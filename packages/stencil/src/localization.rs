//! Localized strings.
//!
//! Translations live under a root directory with one sub-directory per
//! language (`en-US`, `de-DE`, ...). Each `.ftl` file in a language directory
//! holds `key = value` lines; blank lines and lines starting with `#` are
//! ignored. Values may contain `{$name}` placeholders.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::content::collect_files;
use crate::error::{Error, Result};

/// The language used when the requested one has no translations.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// A table of localized strings for one language.
#[derive(Debug, Clone)]
pub struct Localization {
    language: String,
    entries: HashMap<String, String>,
}

impl Localization {
    pub fn new(language: impl Into<String>) -> Localization {
        Localization {
            language: language.into(),
            entries: HashMap::new(),
        }
    }

    /// Load the translations for the configured language from the configured
    /// localization directory.
    pub fn from_config(config: &Config) -> Result<Localization> {
        let mut localization = Localization::new(config.language.as_str());
        localization.load_directory(&config.localization_dir)?;
        Ok(localization)
    }

    /// Return the active language.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Pick the directory to load for the active language.
    fn language_dir(&self, root: &Path) -> PathBuf {
        let dir = root.join(&self.language);
        if dir.is_dir() {
            return dir;
        }

        warn!(language = %self.language, fallback = DEFAULT_LANGUAGE,
              "no localization directory for language, using fallback");
        root.join(DEFAULT_LANGUAGE)
    }

    /// Replace the table with the translations found under `root`.
    ///
    /// Returns the number of entries loaded. Files that cannot be read are
    /// logged and skipped; when several files define a key, the one whose
    /// path sorts last wins.
    pub fn load_directory(&mut self, root: impl AsRef<Path>) -> Result<usize> {
        let dir = self.language_dir(root.as_ref());
        let files = collect_files(&dir, &is_localization_file)?;

        let parsed: Vec<_> = files.par_iter()
            .map(|path| fs::read_to_string(path)
                .map(|source| parse_entries(&source, path))
                .map_err(|err| Error::io(path, err)))
            .collect();

        self.entries.clear();
        for result in parsed {
            match result {
                Ok(entries) => self.entries.extend(entries),
                Err(err) => error!("failed to load localization file: {}", err),
            }
        }

        debug!(language = %self.language, files = files.len(), entries = self.entries.len(),
               "loaded localization");
        Ok(self.entries.len())
    }

    /// Add the entries in `source` to the table.
    pub fn load_str(&mut self, source: &str) {
        self.entries.extend(parse_entries(source, Path::new("<memory>")));
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a localized string. A missing key is returned unchanged.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, String::as_str)
    }

    /// Look up a localized string and substitute its `{$name}` placeholders.
    pub fn format(&self, key: &str, args: &[(&str, &dyn Display)]) -> String {
        let mut output = self.get(key).to_owned();
        for (name, value) in args {
            let placeholder = format!("{{${}}}", name);
            if output.contains(&placeholder) {
                output = output.replace(&placeholder, &value.to_string());
            }
        }
        output
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for Localization {
    fn default() -> Self {
        Localization::new(DEFAULT_LANGUAGE)
    }
}

fn is_localization_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.starts_with("ftl"))
}

fn parse_entries(source: &str, path: &Path) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                entries.push((key.trim().to_owned(), value.trim().to_owned()));
            }
            _ => warn!(path = %path.display(), line = number + 1, "invalid localization line: {}", line),
        }
    }
    entries
}
