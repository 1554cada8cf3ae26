//! Compiler for a CSS superset with nested rules, `$variables`, parameterized
//! traits, `@import` and image inlining.
//!
//! ```ignore
//! use csslike_core::{compile, CompileOptions};
//!
//! let css = compile("a { &:hover { color: red } }", &CompileOptions::default())?;
//! assert_eq!(css, "a {\n}\na:hover {\n  color: red;\n}");
//! ```

pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod inline;
pub mod lexer;
pub mod loader;
pub mod minify;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod token;

pub use cache::{CachedStyle, CompileCache};
pub use config::CompileOptions;
pub use error::{CompileError, ConfigError, LexError, Span};
pub use lexer::lex;
pub use minify::minify;
pub use parser::parse;
pub use token::Token;

use std::path::Path;

/// Lex and parse `source` in one step.
pub fn compile(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    parse(lex(source)?, options)
}

/// Compile a stylesheet on disk. Imports and images resolve against the
/// file's own directory regardless of `options.directory`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<String, CompileError> {
    let (canonical, source) = loader::load_source(path)?;
    let options = options.clone().with_directory(loader::parent_dir(&canonical));

    let mut scope = scope::Scope::new();
    scope.enter_import(canonical);
    parser::parse_in(lex(&source)?, &options, &mut scope)
}
