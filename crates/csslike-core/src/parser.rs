//! Recursive-descent parser that emits formatted CSS as it goes.
//!
//! Nested rules are flattened: a rule inside another rule is rendered after
//! its parent's closing brace with the combined selector. Block at-rules
//! keep their body wrapped.

use crate::config::CompileOptions;
use crate::emitter;
use crate::error::CompileError;
use crate::inline::inline_images;
use crate::lexer::lex;
use crate::loader::{self, ImportTarget};
use crate::minify::minify;
use crate::resolver;
use crate::scope::{Declaration, Scope, Trait};
use crate::token::Token;
use std::path::PathBuf;

const TRAIT: &str = "@trait";
const VAR: &str = "@var";
const MIXIN: &str = "@mixin";
const IMPORT: &str = "@import";

/// Parse a token stream with a fresh scope.
pub fn parse(tokens: Vec<Token>, options: &CompileOptions) -> Result<String, CompileError> {
    let mut scope = Scope::new();
    parse_in(tokens, options, &mut scope)
}

/// Parse inside an existing scope, then tidy and optionally minify.
pub(crate) fn parse_in(
    tokens: Vec<Token>,
    options: &CompileOptions,
    scope: &mut Scope,
) -> Result<String, CompileError> {
    let raw = Parser::new(tokens, scope, options.directory.clone(), 0).run()?;
    let out = emitter::cleanup(&raw);
    Ok(if options.minify { minify(&out) } else { out })
}

struct Parser<'s> {
    tokens: std::vec::IntoIter<Token>,
    scope: &'s mut Scope,
    directory: PathBuf,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(tokens: Vec<Token>, scope: &'s mut Scope, directory: PathBuf, depth: usize) -> Self {
        Self {
            tokens: tokens.into_iter(),
            scope,
            directory,
            depth,
        }
    }

    fn next(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Next token inside a block opened on `line`.
    fn next_in_block(&mut self, line: usize) -> Result<Token, CompileError> {
        self.next().ok_or(CompileError::UnclosedBlock { line })
    }

    fn run(mut self) -> Result<String, CompileError> {
        let mut out = String::new();
        while let Some(token) = self.next() {
            out.push_str(&self.item(token)?);
        }
        Ok(out)
    }

    fn item(&mut self, token: Token) -> Result<String, CompileError> {
        match token {
            Token::Comment { text, .. } => Ok(emitter::comment(&text, self.depth)),
            Token::Rule { selector, line } => {
                self.rule(&emitter::collapse_whitespace(&selector), line)
            }
            Token::NestedAt { name, params, line } => self.nested_at(&name, &params, line, None),
            Token::At { name, params, line } => self.at(&name, &params, line),
            Token::Property { key, val, line } => self.property(&key, &val, line),
            Token::End { line } => Err(CompileError::UnexpectedToken {
                token: token.to_string(),
                line,
            }),
        }
    }

    /// Render an item one level deeper than the current block.
    fn child_item(&mut self, token: Token) -> Result<String, CompileError> {
        self.depth += 1;
        let out = self.item(token);
        self.depth -= 1;
        out
    }

    fn rule(&mut self, selector: &str, line: usize) -> Result<String, CompileError> {
        let (body, below) = self.rule_body(selector, line)?;
        Ok(emitter::block(selector, &body, self.depth) + &below)
    }

    /// Consume a rule body. Returns the block's own contents and the
    /// flattened rules that go after it.
    fn rule_body(&mut self, selector: &str, line: usize) -> Result<(String, String), CompileError> {
        let mut body = String::new();
        let mut below = String::new();

        loop {
            match self.next_in_block(line)? {
                Token::End { .. } => break,
                Token::Rule {
                    selector: child,
                    line,
                } => {
                    let nested =
                        emitter::nest_selector(selector, &emitter::collapse_whitespace(&child));
                    below.push_str(&self.rule(&nested, line)?);
                }
                Token::NestedAt { name, params, line } => {
                    below.push_str(&self.nested_at(&name, &params, line, Some(selector))?);
                }
                token => body.push_str(&self.child_item(token)?),
            }
        }
        Ok((body, below))
    }

    /// A block at-rule. Inside a rule, its direct declarations are wrapped
    /// in the parent selector.
    fn nested_at(
        &mut self,
        name: &str,
        params: &str,
        line: usize,
        parent: Option<&str>,
    ) -> Result<String, CompileError> {
        if name == TRAIT {
            self.define_trait(params, line)?;
            return Ok(String::new());
        }

        self.depth += 1;
        let content = match parent {
            Some(selector) => self.rule_body(selector, line).map(|(body, below)| {
                if body.trim().is_empty() {
                    below
                } else {
                    emitter::block(selector, &body, self.depth) + &below
                }
            }),
            None => self.at_body(line),
        };
        self.depth -= 1;

        let header = if params.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, params)
        };
        Ok(emitter::at_block(&header, &content?, self.depth))
    }

    fn at_body(&mut self, line: usize) -> Result<String, CompileError> {
        let mut out = String::new();
        loop {
            match self.next_in_block(line)? {
                Token::End { .. } => return Ok(out),
                token => out.push_str(&self.item(token)?),
            }
        }
    }

    fn define_trait(&mut self, header: &str, line: usize) -> Result<(), CompileError> {
        let (name, params) =
            resolver::split_call(header).ok_or_else(|| CompileError::UnexpectedToken {
                token: format!("trait header `{}`", header),
                line,
            })?;
        let params = params
            .map(resolver::split_arguments)
            .unwrap_or_default()
            .into_iter()
            .map(|param| param.trim_start_matches('$').to_string())
            .filter(|param| !param.is_empty())
            .collect();

        let mut body = Vec::new();
        loop {
            match self.next_in_block(line)? {
                Token::End { .. } => break,
                Token::Property { key, val, .. } => body.push(Declaration { key, val }),
                other => {
                    return Err(CompileError::UnexpectedToken {
                        line: other.line(),
                        token: other.to_string(),
                    })
                }
            }
        }

        tracing::debug!(name, line, "defined trait");
        self.scope.traits.define(Trait {
            name: name.to_string(),
            params,
            body,
            directory: self.directory.clone(),
        });
        Ok(())
    }

    fn at(&mut self, name: &str, params: &str, line: usize) -> Result<String, CompileError> {
        match name {
            VAR => {
                self.declare_variable(params, line)?;
                Ok(String::new())
            }
            MIXIN => self.mixin(params, line),
            IMPORT => self.import(params, line),
            _ if params.is_empty() => Ok(format!("{}{};", emitter::indent(self.depth), name)),
            _ => Ok(format!("{}{} {};", emitter::indent(self.depth), name, params)),
        }
    }

    fn declare_variable(&mut self, params: &str, line: usize) -> Result<(), CompileError> {
        let (name, value) = match params.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => (params, ""),
        };
        if name.is_empty() {
            tracing::warn!(line, "ignoring @var without a name");
            return Ok(());
        }
        if !name.starts_with('$') {
            tracing::warn!(name, line, "variable name without `$` can never be referenced");
        }
        if value.is_empty() {
            return Err(CompileError::EmptyVariable {
                name: name.to_string(),
                line,
            });
        }

        let value = resolver::substitute(value, &self.scope.variables, line)?;
        self.scope.variables.set(name, value);
        Ok(())
    }

    fn mixin(&mut self, params: &str, line: usize) -> Result<String, CompileError> {
        let undeclared = || CompileError::UndeclaredMixin {
            name: params.to_string(),
            line,
        };
        let (name, args) = resolver::split_call(params).ok_or_else(undeclared)?;
        let definition = self.scope.traits.get(name).ok_or_else(|| CompileError::UndeclaredMixin {
            name: name.to_string(),
            line,
        })?;

        let args = args
            .map(resolver::split_arguments)
            .unwrap_or_default()
            .iter()
            .map(|arg| resolver::substitute(arg, &self.scope.variables, line))
            .collect::<Result<Vec<_>, _>>()?;
        let decls = resolver::expand(definition, &args, &self.scope.variables, line)?;

        let directory = definition.directory.clone();
        Ok(decls
            .iter()
            .map(|decl| {
                emitter::declaration(&decl.key, &inline_images(&decl.val, &directory), self.depth)
            })
            .collect())
    }

    fn import(&mut self, params: &str, line: usize) -> Result<String, CompileError> {
        let target = match loader::import_target(params) {
            ImportTarget::Remote(url) => {
                return Ok(format!("{}{} {};", emitter::indent(self.depth), IMPORT, url));
            }
            ImportTarget::Local(target) => target,
        };

        let import = loader::load_import(&self.directory, &target, self.scope, line)?;
        let tokens = lex(&import.source)?;

        self.scope.enter_import(import.path);
        let out = Parser::new(tokens, &mut *self.scope, import.directory, self.depth).run();
        self.scope.leave_import();
        out
    }

    fn property(&mut self, key: &str, val: &str, line: usize) -> Result<String, CompileError> {
        let val = resolver::substitute(val, &self.scope.variables, line)?;
        let val = inline_images(&val, &self.directory);
        Ok(emitter::declaration(key, &val, self.depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Result<String, CompileError> {
        parse(lex(src)?, &CompileOptions::default())
    }

    #[test]
    fn flat_rules_are_reformatted() {
        let out = compile("a{color:red;margin:0  auto}\nb { top : 0 }").unwrap();
        assert_eq!(out, "a {\n  color: red;\n  margin: 0  auto;\n}\nb {\n  top: 0;\n}");
    }

    #[test]
    fn nested_rules_are_flattened_after_parent() {
        let out = compile("a { color: red; b { top: 0; } &:hover { color: blue; } }").unwrap();
        assert_eq!(
            out,
            "a {\n  color: red;\n}\na b {\n  top: 0;\n}\na:hover {\n  color: blue;\n}"
        );
    }

    #[test]
    fn deep_nesting_combines_all_levels() {
        let out = compile("nav { ul { li { a { x: y } } } }").unwrap();
        assert!(out.ends_with("nav ul li a {\n  x: y;\n}"));
    }

    #[test]
    fn comma_parents_multiply_nested_selectors() {
        let out = compile("a, b { color: red; &.on { color: blue; } }").unwrap();
        assert_eq!(
            out,
            "a,\nb {\n  color: red;\n}\na.on,\nb.on {\n  color: blue;\n}"
        );
    }

    #[test]
    fn variables_substitute_and_chain() {
        let out = compile("@var $base 4px;\n@var $pad $base $base;\na { padding: $pad; }").unwrap();
        assert_eq!(out, "a {\n  padding: 4px 4px;\n}");
    }

    #[test]
    fn later_variable_wins() {
        let out = compile("@var $c red;\na { color: $c }\n@var $c blue;\nb { color: $c }").unwrap();
        assert_eq!(out, "a {\n  color: red;\n}\nb {\n  color: blue;\n}");
    }

    #[test]
    fn undeclared_variable_is_an_error() {
        let err = compile("a {\n  color: $missing;\n}").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UndeclaredVariable { ref name, line: 2 } if name == "$missing"
        ));
    }

    #[test]
    fn traits_expand_positionally() {
        let src = "@trait box(a, b) { width: $a; height: $b; }\n.x { @mixin box(1px, 2px); }";
        let out = compile(src).unwrap();
        assert_eq!(out, ".x {\n  width: 1px;\n  height: 2px;\n}");
    }

    #[test]
    fn trait_missing_argument_keeps_placeholder() {
        let src = "@trait pair($a, $b) { margin: $a $b; }\n.x { @mixin pair(1); }";
        let out = compile(src).unwrap();
        assert_eq!(out, ".x {\n  margin: 1 $b;\n}");
    }

    #[test]
    fn trait_arguments_may_contain_parens_and_globals() {
        let src = "@var $alpha .5;\n@trait shade($c, $w) { box-shadow: 0 0 $w $c; }\n.x { @mixin shade(rgba(0, 0, 0, $alpha), 3px); }";
        let out = compile(src).unwrap();
        assert_eq!(out, ".x {\n  box-shadow: 0 0 3px rgba(0, 0, 0, .5);\n}");
    }

    #[test]
    fn parenthesized_mixin_argument_passes_a_comma_list() {
        let src = "@trait sh($a) { box-shadow: $a; }\n.x { @mixin sh((0 0 1px red, 0 0 2px blue)); }";
        let out = compile(src).unwrap();
        assert_eq!(out, ".x {\n  box-shadow: 0 0 1px red, 0 0 2px blue;\n}");
    }

    #[test]
    fn variable_without_value_is_rejected() {
        let err = compile("a { b: c }\n@var $x;\na { b: $x }").unwrap_err();
        assert!(matches!(err, CompileError::EmptyVariable { ref name, line: 2 } if name == "$x"));
    }

    #[test]
    fn declaration_without_name_is_dropped() {
        assert_eq!(compile("a { : foo; b: c }").unwrap(), "a {\n  b: c;\n}");
    }

    #[test]
    fn trait_can_be_invoked_repeatedly() {
        let src = "@trait c($v) { color: $v; }\na { @mixin c(red); }\nb { @mixin c(blue); }";
        let out = compile(src).unwrap();
        assert_eq!(out, "a {\n  color: red;\n}\nb {\n  color: blue;\n}");
    }

    #[test]
    fn trait_without_params() {
        let src = "@trait clearfix { clear: both; }\na { @mixin clearfix; }";
        assert_eq!(compile(src).unwrap(), "a {\n  clear: both;\n}");
    }

    #[test]
    fn undeclared_mixin_is_an_error() {
        let err = compile("a {\n\n  @mixin ghost(1);\n}").unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredMixin { ref name, line: 3 } if name == "ghost"));
    }

    #[test]
    fn trait_body_only_allows_properties() {
        let err = compile("@trait t { a { b: c } }").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedToken { line: 1, .. }));
    }

    #[test]
    fn media_blocks_are_wrapped_not_flattened() {
        let out = compile("@media print {\n  a { color: black; b { x: y } }\n}\nc { d: e }").unwrap();
        assert_eq!(
            out,
            "@media print {\n  a {\n    color: black;\n  }\n  a b {\n    x: y;\n  }\n}\n\nc {\n  d: e;\n}"
        );
    }

    #[test]
    fn media_inside_rule_bubbles_with_parent_selector() {
        let out = compile("a { color: red; @media print { color: black; } }").unwrap();
        assert_eq!(
            out,
            "a {\n  color: red;\n}\n@media print {\n  a {\n    color: black;\n  }\n}"
        );
    }

    #[test]
    fn unknown_at_rules_pass_through() {
        let out = compile("@charset \"utf-8\";\n@import url(\"http://x/y.css\");").unwrap();
        assert_eq!(out, "@charset \"utf-8\";\n@import url(\"http://x/y.css\");");
    }

    #[test]
    fn comments_are_normalized() {
        let out = compile("/* a  *  b */\na { x: y }").unwrap();
        assert_eq!(out, "/**\n * a b\n */\n\na {\n  x: y;\n}");
    }

    #[test]
    fn stray_close_brace_is_rejected() {
        let err = compile("a { x: y } }").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedToken { line: 1, .. }));
    }

    #[test]
    fn unbalanced_token_stream_is_rejected() {
        let tokens = vec![Token::Rule {
            selector: "a".into(),
            line: 4,
        }];
        let err = parse(tokens, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::UnclosedBlock { line: 4 }));
    }

    #[test]
    fn each_parse_gets_fresh_tables() {
        compile("@var $x 1;").unwrap();
        assert!(compile("a { b: $x }").is_err());
    }

    #[test]
    fn minify_option_squeezes_output() {
        let tokens = lex("a { color: red; b { top: 0 } }").unwrap();
        let out = parse(tokens, &CompileOptions::default().with_minify(true)).unwrap();
        assert_eq!(out, "a{color:red}a b{top:0}");
    }
}
