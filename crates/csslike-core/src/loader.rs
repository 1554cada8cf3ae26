use crate::error::CompileError;
use crate::scope::Scope;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A local stylesheet pulled in by `@import`.
#[derive(Debug)]
pub struct Import {
    /// Canonical path, used to detect import cycles.
    pub path: PathBuf,
    /// Directory nested imports and images resolve against.
    pub directory: PathBuf,
    pub source: String,
}

/// What an `@import` statement refers to.
#[derive(Debug, PartialEq, Eq)]
pub enum ImportTarget<'a> {
    /// `url(...)` imports are left for the browser.
    Remote(&'a str),
    Local(String),
}

pub fn import_target(params: &str) -> ImportTarget<'_> {
    let params = params.trim();
    if params.starts_with("url") {
        ImportTarget::Remote(params)
    } else {
        ImportTarget::Local(strip_quotes(params))
    }
}

pub fn strip_quotes(text: &str) -> String {
    text.trim().replace(['"', '\''], "")
}

/// Resolve and read an import relative to `directory`.
pub fn load_import(
    directory: &Path,
    target: &str,
    scope: &Scope,
    line: usize,
) -> Result<Import, CompileError> {
    let joined = directory.join(target);
    let read_error = |source: io::Error| CompileError::ImportRead {
        path: joined.clone(),
        line,
        source,
    };

    let canonical = joined.canonicalize().map_err(read_error)?;
    if scope.is_importing(&canonical) {
        return Err(CompileError::RecursiveImport {
            path: canonical,
            line,
        });
    }

    let source = fs::read_to_string(&canonical).map_err(read_error)?;
    let directory = parent_dir(&canonical);
    tracing::debug!(path = %canonical.display(), "importing stylesheet");

    Ok(Import {
        path: canonical,
        directory,
        source,
    })
}

/// Read the stylesheet handed to a top-level compile.
pub fn load_source(path: &Path) -> Result<(PathBuf, String), CompileError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| CompileError::read(path, e))?;
    let source = fs::read_to_string(&canonical).map_err(|e| CompileError::read(path, e))?;
    Ok((canonical, source))
}

pub fn read_image(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/imports")
    }

    #[test]
    fn classifies_import_targets() {
        assert_eq!(
            import_target("url(\"http://cdn/x.css\")"),
            ImportTarget::Remote("url(\"http://cdn/x.css\")")
        );
        assert_eq!(
            import_target("\"partials/base.css\""),
            ImportTarget::Local("partials/base.css".into())
        );
        assert_eq!(import_target("'a.css'"), ImportTarget::Local("a.css".into()));
    }

    #[test]
    fn loads_relative_import() {
        let scope = Scope::new();
        let import = load_import(&fixture_dir(), "partials/colors.css", &scope, 3).expect("load import");
        assert!(import.source.contains("@var"));
        assert!(import.directory.ends_with("partials"));
    }

    #[test]
    fn detect_cycles() {
        let mut scope = Scope::new();
        let path = fixture_dir().join("cycle-a.css").canonicalize().unwrap();
        scope.enter_import(path);
        let err = load_import(&fixture_dir(), "cycle-a.css", &scope, 1).unwrap_err();
        assert!(matches!(err, CompileError::RecursiveImport { line: 1, .. }));
    }

    #[test]
    fn missing_file_error() {
        let err = load_import(&fixture_dir(), "missing.css", &Scope::new(), 5).unwrap_err();
        assert!(matches!(err, CompileError::ImportRead { line: 5, .. }));
        assert_eq!(err.line(), Some(5));
    }
}
