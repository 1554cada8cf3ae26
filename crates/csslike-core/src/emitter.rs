//! Text layout for compiled output: two spaces per depth, one selector
//! branch per line.

use crate::resolver::split_top_level;
use regex::Regex;
use std::sync::LazyLock;

static PAREN_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\() +| +(\))|(, ) +").unwrap());
static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]+\n").unwrap());

/// Newline followed by the indentation for `depth`.
pub fn indent(depth: usize) -> String {
    let mut out = String::with_capacity(1 + depth * 2);
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Top-level comma branches of a selector list, trimmed.
pub fn selector_branches(selector: &str) -> Vec<&str> {
    split_top_level(selector, ',')
        .into_iter()
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .collect()
}

/// Combine a nested selector with its parent.
///
/// Every `&` in the child is replaced by each parent branch; a child with
/// no `&` becomes a descendant of each branch.
pub fn nest_selector(parent: &str, child: &str) -> String {
    let parents = selector_branches(parent);
    let children = selector_branches(child);
    if parents.is_empty() {
        return children.join(", ");
    }

    let mut combined = Vec::with_capacity(parents.len() * children.len().max(1));
    for parent in &parents {
        for child in &children {
            if child.contains('&') {
                combined.push(child.replace('&', parent));
            } else {
                combined.push(format!("{} {}", parent, child));
            }
        }
    }
    combined.join(", ")
}

pub fn format_selector(selector: &str, depth: usize) -> String {
    let separator = format!(",{}", indent(depth));
    selector_branches(&collapse_whitespace(selector)).join(&separator)
}

/// `selector { body }` opening at `depth`. `body` carries its own line
/// breaks.
pub fn block(selector: &str, body: &str, depth: usize) -> String {
    format!(
        "{}{} {{{}{}}}",
        indent(depth),
        format_selector(selector, depth),
        body,
        indent(depth)
    )
}

/// `@name params { body }` opening at `depth`.
pub fn at_block(header: &str, body: &str, depth: usize) -> String {
    format!("{}{} {{{}{}}}\n", indent(depth), header, body, indent(depth))
}

pub fn declaration(key: &str, val: &str, depth: usize) -> String {
    format!("{}{}: {};", indent(depth), key, tidy_value(val))
}

/// Drop padding just inside parentheses and after `, `.
pub fn tidy_value(val: &str) -> String {
    PAREN_SPACE.replace_all(val, "$1$2$3").into_owned()
}

pub fn comment(text: &str, depth: usize) -> String {
    let text = collapse_whitespace(&text.replace('*', ""));
    let pad = indent(depth);
    format!("\n{pad}/**{pad} * {text}{pad} */\n")
}

/// Final pass over the assembled output.
pub fn cleanup(out: &str) -> String {
    BLANK_LINE
        .replace_all(out, "")
        .replace("}\n\n}", "}\n}")
        .trim()
        .to_string()
}
