//! Compiled output keyed by source path and modification time.
//!
//! A stylesheet is recompiled only when its mtime differs from the one the
//! cached output was produced from.

use crate::config::CompileOptions;
use crate::error::CompileError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct CachedStyle {
    modified: SystemTime,
    bytes: Arc<[u8]>,
}

impl CachedStyle {
    /// Modification time of the source the output was compiled from.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CompileCache {
    entries: HashMap<PathBuf, CachedStyle>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return compiled output for `path`, compiling only on an mtime change.
    pub fn load(&mut self, path: &Path, options: &CompileOptions) -> Result<CachedStyle, CompileError> {
        let modified = modified_time(path)?;
        if let Some(cached) = self.entries.get(path) {
            if cached.modified == modified {
                tracing::trace!(path = %path.display(), "serving cached stylesheet");
                return Ok(cached.clone());
            }
        }

        tracing::debug!(path = %path.display(), "compiling stylesheet");
        let css = crate::compile_file(path, options)?;
        let entry = CachedStyle {
            modified,
            bytes: Arc::from(css.into_bytes()),
        };
        self.entries.insert(path.to_path_buf(), entry.clone());
        Ok(entry)
    }

    /// Whether the cached output for `path` was produced from a source with
    /// modification time `since`.
    pub fn is_fresh(&self, path: &Path, since: SystemTime) -> bool {
        self.entries
            .get(path)
            .is_some_and(|cached| cached.modified == since)
    }

    pub fn get(&self, path: &Path) -> Option<&CachedStyle> {
        self.entries.get(path)
    }

    /// Drop the entry for `path`, e.g. after the file was removed.
    pub fn invalidate(&mut self, path: &Path) -> Option<CachedStyle> {
        self.entries.remove(path)
    }
}

fn modified_time(path: &Path) -> Result<SystemTime, CompileError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| CompileError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn recompiles_only_when_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.css");
        let first = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);

        fs::write(&path, "a { color: red }").unwrap();
        set_mtime(&path, first);

        let mut cache = CompileCache::new();
        let options = CompileOptions::default();
        let style = cache.load(&path, &options).unwrap();
        assert_eq!(style.bytes(), b"a {\n  color: red;\n}");
        assert_eq!(style.modified(), first);

        // Same mtime: stale content keeps being served.
        fs::write(&path, "a { color: blue }").unwrap();
        set_mtime(&path, first);
        assert_eq!(cache.load(&path, &options).unwrap().bytes(), b"a {\n  color: red;\n}");

        let second = first + Duration::from_secs(60);
        set_mtime(&path, second);
        let style = cache.load(&path, &options).unwrap();
        assert_eq!(style.bytes(), b"a {\n  color: blue;\n}");
        assert!(cache.is_fresh(&path, second));
        assert!(!cache.is_fresh(&path, first));
    }

    #[test]
    fn invalidated_entries_are_recompiled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.css");
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000);
        fs::write(&path, "a { color: red }").unwrap();
        set_mtime(&path, stamp);

        let mut cache = CompileCache::new();
        let options = CompileOptions::default();
        cache.load(&path, &options).unwrap();
        assert!(cache.invalidate(&path).is_some());
        assert!(cache.get(&path).is_none());

        fs::write(&path, "a { color: blue }").unwrap();
        set_mtime(&path, stamp);
        assert_eq!(cache.load(&path, &options).unwrap().bytes(), b"a {\n  color: blue;\n}");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CompileCache::new();
        let err = cache
            .load(&dir.path().join("gone.css"), &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Read { .. }));
    }

    #[test]
    fn compile_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.css");
        fs::write(&path, "a { color: $nope }").unwrap();

        let mut cache = CompileCache::new();
        assert!(cache.load(&path, &CompileOptions::default()).is_err());
        assert!(cache.get(&path).is_none());
    }
}
