use crate::error::CompileError;
use crate::scope::{Declaration, Trait, Variables};
use regex::Regex;
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[\w-]+").unwrap());

/// Replace every `$name` in `text` with its value from `vars`.
pub fn substitute(text: &str, vars: &Variables, line: usize) -> Result<String, CompileError> {
    replace_variables(text, |name| match vars.get(name) {
        Some(value) => Ok(value.to_string()),
        None => Err(CompileError::UndeclaredVariable {
            name: name.to_string(),
            line,
        }),
    })
}

fn replace_variables<F>(text: &str, mut lookup: F) -> Result<String, CompileError>
where
    F: FnMut(&str) -> Result<String, CompileError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in VARIABLE.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        out.push_str(&lookup(found.as_str())?);
        last = found.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand a trait with positional `args` (already resolved against the
/// globals).
///
/// A placeholder resolves to its bound argument first, then to a global of
/// the same name. A parameter left without an argument stays as literal
/// placeholder text; any other unknown name is an error.
pub fn expand(
    definition: &Trait,
    args: &[String],
    vars: &Variables,
    line: usize,
) -> Result<Vec<Declaration>, CompileError> {
    if args.len() > definition.params.len() {
        tracing::debug!(
            name = %definition.name,
            expected = definition.params.len(),
            given = args.len(),
            "extra mixin arguments ignored"
        );
    }

    definition
        .body
        .iter()
        .map(|decl| {
            let val = replace_variables(&decl.val, |name| {
                let param = definition.param_index(name);
                if let Some(arg) = param.and_then(|index| args.get(index)) {
                    return Ok(arg.clone());
                }
                if let Some(value) = vars.get(name) {
                    return Ok(value.to_string());
                }
                if param.is_some() {
                    return Ok(name.to_string());
                }
                Err(CompileError::UndeclaredVariable {
                    name: name.to_string(),
                    line,
                })
            })?;
            Ok(Declaration {
                key: decl.key.clone(),
                val,
            })
        })
        .collect()
}

/// Split `name(a, b)` into the name and the raw argument list.
///
/// Returns `None` when the header does not start with an identifier.
pub fn split_call(header: &str) -> Option<(&str, Option<&str>)> {
    let header = header.trim();
    let end = header
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(header.len());
    if end == 0 {
        return None;
    }

    let (name, rest) = header.split_at(end);
    let rest = rest.trim();
    let args = rest
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .map(str::trim)
        .filter(|inner| !inner.is_empty());
    if args.is_none() && !rest.is_empty() && rest != "()" {
        tracing::debug!(header, "ignoring text after call name");
    }
    Some((name, args))
}

/// Split a call's argument list on top-level commas. An argument wrapped
/// in one pair of parentheses loses them, so `(a, b)` passes a comma list
/// as a single argument.
pub fn split_arguments(list: &str) -> Vec<String> {
    split_top_level(list, ',')
        .into_iter()
        .map(|arg| unwrap_parens(arg.trim()).to_string())
        .collect()
}

/// Strip one enclosing `(`…`)` pair when the opening paren closes at the end.
fn unwrap_parens(arg: &str) -> &str {
    let Some(inner) = arg.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) else {
        return arg;
    };
    let mut depth = 0usize;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => return arg,
            ')' => depth -= 1,
            _ => {}
        }
    }
    inner.trim()
}

/// Split on `sep` outside parentheses, brackets and quotes.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
