//! Symbol tables owned by a single compile call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `$name` → resolved value. Names keep their leading `$`.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

}

/// A declaration captured in a trait body, not yet substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub key: String,
    pub val: String,
}

/// A named, parameterized block of declarations.
#[derive(Debug, Clone)]
pub struct Trait {
    pub name: String,
    /// Parameter names without the leading `$`, in call order.
    pub params: Vec<String>,
    pub body: Vec<Declaration>,
    /// Directory in effect where the trait was defined; `url()` images in
    /// the body resolve against it.
    pub directory: PathBuf,
}

impl Trait {
    /// Position of the parameter bound to placeholder `$name`.
    pub fn param_index(&self, placeholder: &str) -> Option<usize> {
        let name = placeholder.strip_prefix('$').unwrap_or(placeholder);
        self.params.iter().position(|param| param == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Traits {
    traits: HashMap<String, Trait>,
}

impl Traits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trait. A later definition with the same name wins.
    pub fn define(&mut self, definition: Trait) {
        if self.traits.contains_key(&definition.name) {
            tracing::debug!(name = %definition.name, "redefining trait");
        }
        self.traits.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&Trait> {
        self.traits.get(name)
    }
}

/// Per-compile state shared by a stylesheet and everything it imports.
#[derive(Debug, Default)]
pub struct Scope {
    pub variables: Variables,
    pub traits: Traits,
    /// Files currently being imported, outermost first.
    imports: Vec<PathBuf>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_importing(&self, path: &Path) -> bool {
        self.imports.iter().any(|open| open == path)
    }

    pub(crate) fn enter_import(&mut self, path: PathBuf) {
        self.imports.push(path);
    }

    pub(crate) fn leave_import(&mut self) {
        self.imports.pop();
    }
}
