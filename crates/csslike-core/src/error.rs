use std::fmt;
use std::path::PathBuf;

/// Source position, 1-based for both line and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub const fn start() -> Self {
        Self { line: 1, column: 0 }
    }

    /// Move past `ch`. Newlines start a new line at column 0 so the next
    /// character lands on column 1.
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors raised while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("control character {ch:?} found at {span}")]
    ControlCharacter { ch: char, span: Span },

    #[error("unterminated {construct} opened on line {line}")]
    Unterminated { construct: &'static str, line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            Self::ControlCharacter { span, .. } => span.line,
            Self::Unterminated { line, .. } => *line,
        }
    }
}

/// Errors that abort a compile. None of them produce partial output.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected token {token} on line {line}")]
    UnexpectedToken { token: String, line: usize },

    #[error("undeclared variable {name} on line {line}")]
    UndeclaredVariable { name: String, line: usize },

    #[error("variable {name} declared without a value on line {line}")]
    EmptyVariable { name: String, line: usize },

    #[error("undeclared mixin {name} on line {line}")]
    UndeclaredMixin { name: String, line: usize },

    #[error("failed to import '{}' on line {line}: {source}", path.display())]
    ImportRead {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("recursive import of '{}' on line {line}", path.display())]
    RecursiveImport { path: PathBuf, line: usize },

    #[error("block opened on line {line} is never closed")]
    UnclosedBlock { line: usize },

    #[error("failed to read stylesheet '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Line of the source construct that caused the error, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lex(err) => Some(err.line()),
            Self::UnexpectedToken { line, .. }
            | Self::UndeclaredVariable { line, .. }
            | Self::EmptyVariable { line, .. }
            | Self::UndeclaredMixin { line, .. }
            | Self::ImportRead { line, .. }
            | Self::RecursiveImport { line, .. }
            | Self::UnclosedBlock { line } => Some(*line),
            Self::Read { .. } => None,
        }
    }
}

/// Errors loading a JSON options file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_tracks_lines_and_columns() {
        let mut span = Span::start();
        for ch in "ab\nc".chars() {
            span.advance(ch);
        }
        assert_eq!(span, Span { line: 2, column: 1 });
        assert_eq!(span.to_string(), "2:1");
    }

    #[test]
    fn compile_error_reports_line() {
        let err = CompileError::from(LexError::ControlCharacter {
            ch: '\u{1}',
            span: Span { line: 3, column: 7 },
        });
        assert_eq!(err.line(), Some(3));
        assert!(err.to_string().contains("3:7"));

        let err = CompileError::UndeclaredVariable {
            name: "$x".into(),
            line: 9,
        };
        assert_eq!(err.line(), Some(9));
        assert_eq!(err.to_string(), "undeclared variable $x on line 9");
    }
}
