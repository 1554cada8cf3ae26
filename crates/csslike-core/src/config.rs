use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for a single compile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Base directory for `@import` and `url()` paths.
    pub directory: PathBuf,
    pub minify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            minify: false,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Load options from a JSON file, e.g.
    ///
    /// ```json
    /// { "directory": "styles", "minify": true }
    /// ```
    ///
    /// Missing fields take their defaults. A relative `directory` is taken
    /// relative to the config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut options: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if options.directory.is_relative() {
            if let Some(parent) = path.parent() {
                options.directory = parent.join(&options.directory);
            }
        }
        Ok(options)
    }
}
