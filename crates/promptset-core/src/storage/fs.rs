//! Filesystem-backed [`JsonStore`]: key `a/b` lives at `<root>/a/b.json`.

use std::path::PathBuf;

use tracing::debug;

use super::{JsonStore, StorageError, key_segments};

/// Stores each key as a pretty-printed JSON file under a root directory.
#[derive(Debug, Clone)]
pub struct FsJsonStore {
    root: PathBuf,
}

impl FsJsonStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `key` to the file that holds it.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let segments = key_segments(key)?;
        let mut path = self.root.clone();
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(format!("{}.json", segments[segments.len() - 1]));
        Ok(path)
    }
}

impl JsonStore for FsJsonStore {
    fn read_json(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.path_for(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        let value = serde_json::from_str(&contents).map_err(|source| StorageError::Json {
            key: key.to_owned(),
            source,
        })?;
        Ok(Some(value))
    }

    fn write_json(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
            key: key.to_owned(),
            source,
        })?;

        // Write to a sibling temp file and rename so a crash never leaves
        // a truncated record behind.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote json record");
        Ok(())
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        key_segments(namespace)?;
        let dir = self.root.join(namespace);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path: dir, source }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
