use serde::Serialize;
use std::fmt;

/// A lexed unit of source. All text fields are trimmed; at-rule names keep
/// their leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    Rule {
        selector: String,
        line: usize,
    },
    /// Closes the innermost `Rule` or `NestedAt`.
    End {
        line: usize,
    },
    NestedAt {
        name: String,
        params: String,
        line: usize,
    },
    At {
        name: String,
        params: String,
        line: usize,
    },
    Property {
        key: String,
        val: String,
        line: usize,
    },
    Comment {
        text: String,
        line: usize,
    },
}

impl Token {
    pub fn line(&self) -> usize {
        match self {
            Token::Rule { line, .. }
            | Token::End { line }
            | Token::NestedAt { line, .. }
            | Token::At { line, .. }
            | Token::Property { line, .. }
            | Token::Comment { line, .. } => *line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Rule { selector, .. } => write!(f, "rule `{}`", selector),
            Token::End { .. } => write!(f, "`}}`"),
            Token::NestedAt { name, params, .. } => write!(f, "block `{} {}`", name, params),
            Token::At { name, params, .. } => write!(f, "at-rule `{} {}`", name, params),
            Token::Property { key, val, .. } => write!(f, "property `{}: {}`", key, val),
            Token::Comment { .. } => write!(f, "comment"),
        }
    }
}
