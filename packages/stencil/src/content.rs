//! Loading entity definitions from content files.
//!
//! Content is a directory tree of RON files, each holding a list of entity
//! definitions:
//!
//! ```ron
//! [
//!     (
//!         id: "goblin",
//!         name: "goblin-name",
//!         description: "goblin-desc",
//!         components: [
//!             (type: "Health", fields: { "hp": 10 }),
//!         ],
//!     ),
//! ]
//! ```
//!
//! Files are read and parsed in parallel; templates are then registered one
//! file at a time in path order, so a later file overrides an earlier one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::template::EntityDefinition;
use crate::universe::Universe;

/// The file extension of content files.
pub const CONTENT_EXTENSION: &str = "ron";

/// The outcome of loading a content directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The number of content files found.
    pub files: usize,
    /// The number of templates registered.
    pub registered: usize,
    /// Every file or definition that could not be loaded.
    pub failures: Vec<Error>,
}

impl LoadReport {
    /// Returns true if everything found was loaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse a list of entity definitions from RON source.
pub fn parse_definitions(source: &str, path: &Path) -> Result<Vec<EntityDefinition>> {
    ron::from_str(source).map_err(|err| Error::parse(path, err))
}

/// Read and parse one content file.
pub fn read_definitions(path: &Path) -> Result<Vec<EntityDefinition>> {
    let source = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    parse_definitions(&source, path)
}

/// Recursively collect the files under `dir` accepted by `filter`, sorted by
/// path.
pub(crate) fn collect_files(dir: &Path, filter: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|err| Error::io(&dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| Error::io(&dir, err))?;
            let path = entry.path();
            // Symlinked directories are not followed.
            let file_type = entry.file_type().map_err(|err| Error::io(&path, err))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "skipping symlinked directory");
            } else if filter(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_content_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == CONTENT_EXTENSION)
}

/// Load every content file under `dir` into the universe's templates.
///
/// Only a missing or unreadable directory fails the whole load. Bad files
/// and invalid definitions are logged, collected into the report and
/// skipped.
pub fn load_directory(universe: &mut Universe, dir: impl AsRef<Path>) -> Result<LoadReport> {
    let start = Instant::now();
    let dir = dir.as_ref();
    let files = collect_files(dir, &is_content_file)?;

    let parsed: Vec<_> = files.par_iter()
        .map(|path| read_definitions(path))
        .collect();

    let mut report = LoadReport {
        files: files.len(),
        ..LoadReport::default()
    };

    for (path, result) in files.iter().zip(parsed) {
        let definitions = match result {
            Ok(definitions) => definitions,
            Err(err) => {
                error!(path = %path.display(), "failed to load content file: {}", err);
                report.failures.push(err);
                continue;
            }
        };

        for definition in &definitions {
            match universe.register_definition(definition) {
                Ok(()) => report.registered += 1,
                Err(err) => {
                    warn!(path = %path.display(), "skipping entity definition: {}", err);
                    report.failures.push(err);
                }
            }
        }
    }

    info!(dir = %dir.display(), files = report.files, registered = report.registered,
          failures = report.failures.len(), elapsed_ms = start.elapsed().as_millis() as u64,
          "loaded content");
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use std::fs;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct HealthComponent {
        hp: i32,
    }

    component!(HealthComponent { hp });

    const GOBLINS: &str = r#"[
        (
            id: "goblin",
            name: "goblin-name",
            components: [(type: "Health", fields: { "hp": 10 })],
        ),
        (id: "goblin-chief", components: [(type: "HealthComponent", fields: { "hp": 25 })]),
    ]"#;

    #[test]
    fn test_parse_definitions() {
        let definitions = parse_definitions(GOBLINS, Path::new("goblins.ron")).unwrap();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[1].id, "goblin-chief");

        let err = parse_definitions("[(id: ", Path::new("broken.ron")).unwrap_err();
        assert!(matches!(err, Error::Parse { ref path, .. } if path == Path::new("broken.ron")));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("monsters")).unwrap();
        fs::write(dir.path().join("monsters").join("goblins.ron"), GOBLINS).unwrap();
        fs::write(dir.path().join("broken.ron"), "[(id: ").unwrap();
        fs::write(dir.path().join("invalid.ron"), r#"[(id: "")]"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not content").unwrap();

        let mut universe = Universe::new();
        universe.components().get_or_register::<HealthComponent>();

        let report = load_directory(&mut universe, dir.path()).unwrap();
        assert_eq!(report.files, 3);
        assert_eq!(report.registered, 2);
        assert_eq!(report.failures.len(), 2);
        assert!(!report.is_clean());

        let chief = universe.templates().get("goblin-chief").unwrap();
        assert_eq!(chief.component::<HealthComponent>(universe.components()).unwrap().hp, 25);
    }

    #[test]
    fn test_later_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ron"), r#"[(id: "rock", name: "first")]"#).unwrap();
        fs::write(dir.path().join("b.ron"), r#"[(id: "rock", name: "second")]"#).unwrap();

        let mut universe = Universe::new();
        let report = load_directory(&mut universe, dir.path()).unwrap();
        assert!(report.is_clean());
        assert_eq!(universe.templates().get("rock").unwrap().name_key(), "second");
        assert_eq!(universe.templates().overwrites(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("monsters")).unwrap();
        fs::write(dir.path().join("monsters").join("rock.ron"), r#"[(id: "rock")]"#).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("monsters").join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("monsters").join("rock.ron"), dir.path().join("alias.ron")).unwrap();

        let mut universe = Universe::new();
        let report = load_directory(&mut universe, dir.path()).unwrap();
        assert_eq!(report.files, 2);
        assert!(report.is_clean());
        assert!(universe.templates().try_get("rock").is_some());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut universe = Universe::new();
        let err = load_directory(&mut universe, dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
