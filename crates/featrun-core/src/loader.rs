//! Spec discovery.
//!
//! [`SpecLoader::discover`] validates the root eagerly and returns a
//! [`SpecStream`]: a lazy, finite iterator that walks the tree in file-name
//! order and parses each matching file as it is reached. The stream is
//! consumed by value and cannot be restarted.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::Spec;
use crate::error::DiscoveryError;
use crate::gherkin;

/// Default recognised spec file extension.
pub const DEFAULT_EXTENSION: &str = "feature";

/// Discovers spec files under a root directory.
#[derive(Debug, Clone)]
pub struct SpecLoader {
    extensions: Vec<String>,
}

impl Default for SpecLoader {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
        }
    }
}

impl SpecLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader recognising the given extensions (without the leading dot).
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Returns true if the path carries a recognised extension.
    pub fn is_spec_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Start discovery under `root`.
    ///
    /// Fails immediately if the root is missing, is not a directory, or
    /// cannot be listed. Per-file read and parse failures are yielded by the
    /// stream.
    pub fn discover(&self, root: impl AsRef<Path>) -> Result<SpecStream, DiscoveryError> {
        let root = root.as_ref().to_path_buf();
        let metadata = match std::fs::metadata(&root) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiscoveryError::RootNotFound { root });
            }
            Err(e) => {
                return Err(DiscoveryError::RootNotReadable {
                    root,
                    reason: e.to_string(),
                });
            }
        };
        if !metadata.is_dir() {
            return Err(DiscoveryError::RootNotReadable {
                root,
                reason: "not a directory".to_string(),
            });
        }
        std::fs::read_dir(&root).map_err(|e| DiscoveryError::RootNotReadable {
            root: root.clone(),
            reason: e.to_string(),
        })?;

        debug!(root = %root.display(), extensions = ?self.extensions, "Discovering specs");
        Ok(SpecStream {
            walker: WalkDir::new(&root).sort_by_file_name().into_iter(),
            loader: self.clone(),
            root,
        })
    }

    /// Discover and parse every spec under `root`, stopping at the first error.
    pub fn load_all(&self, root: impl AsRef<Path>) -> Result<Vec<Spec>, DiscoveryError> {
        self.discover(root)?.collect()
    }
}

/// Lazy sequence of parsed specs.
pub struct SpecStream {
    walker: walkdir::IntoIter,
    loader: SpecLoader,
    root: PathBuf,
}

impl Iterator for SpecStream {
    type Item = Result<Spec, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    return Some(Err(DiscoveryError::Walk {
                        path,
                        reason: e.to_string(),
                    }));
                }
            };
            if !entry.file_type().is_file() || !self.loader.is_spec_file(entry.path()) {
                continue;
            }
            return Some(read_spec(entry.path()));
        }
    }
}

fn read_spec(path: &Path) -> Result<Spec, DiscoveryError> {
    let source = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = gherkin::parse_feature(path, &source)?;
    debug!(spec = %path.display(), scenarios = spec.scenario_count(), "Loaded spec");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_discovers_nested_specs_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b/orders.feature", "Feature: orders\nScenario: o\n * x\n");
        write(tmp.path(), "a/users.feature", "Feature: users\nScenario: u\n * x\n");
        write(tmp.path(), "a/notes.txt", "not a spec");

        let specs = SpecLoader::new().load_all(tmp.path()).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(names, vec!["users", "orders"]);
    }

    #[test]
    fn test_missing_root_is_discovery_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let err = SpecLoader::new().discover(&missing).err().unwrap();
        assert!(matches!(err, DiscoveryError::RootNotFound { .. }));
    }

    #[test]
    fn test_file_root_is_not_readable_dir() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "one.feature", "Feature: one\n");
        let err = SpecLoader::new()
            .discover(tmp.path().join("one.feature"))
            .err()
            .unwrap();
        assert!(matches!(err, DiscoveryError::RootNotReadable { .. }));
    }

    #[test]
    fn test_stream_is_lazy_and_reports_parse_errors_in_place() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.feature", "Feature: a\n");
        write(tmp.path(), "b.feature", "Scenario: broken\n");
        write(tmp.path(), "c.feature", "Feature: c\n");

        let mut stream = SpecLoader::new().discover(tmp.path()).unwrap();
        assert_eq!(stream.next().unwrap().unwrap().feature, "a");
        assert!(matches!(
            stream.next().unwrap(),
            Err(DiscoveryError::Parse { line: 1, .. })
        ));
        assert_eq!(stream.next().unwrap().unwrap().feature, "c");
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_custom_extensions() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "x.spec", "Feature: x\n");
        write(tmp.path(), "y.feature", "Feature: y\n");

        let specs = SpecLoader::with_extensions([".spec"]).load_all(tmp.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].feature, "x");
    }
}
