//! Best-effort whitespace squeeze over compiled output.

use regex::Regex;
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());
static SPACE_BEFORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+([{}])").unwrap());
static SPACE_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(;|,|:|\{|\}|\A)\s+").unwrap());
static COMBINATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+([>+~])\s+").unwrap());
static ESCAPED_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\\n\s+").unwrap());
static TRAILING_SEMICOLON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";(\})").unwrap());

pub fn minify(css: &str) -> String {
    let css = COMMENT.replace_all(css, "");
    let css = SPACE_BEFORE.replace_all(&css, "$1");
    let css = SPACE_AFTER.replace_all(&css, "$1");
    let css = COMBINATOR.replace_all(&css, "$1");
    let css = ESCAPED_NEWLINE.replace_all(&css, "");
    let css = TRAILING_SEMICOLON.replace_all(&css, "$1");
    css.into_owned()
}
