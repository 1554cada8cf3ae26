//! Stack-driven tokenizer.
//!
//! Rules, nested at-rules and property declarations cannot be told apart
//! until several characters after they start: `a:hover {` opens a rule
//! while `color: red;` is a declaration. The lexer tentatively treats a
//! colon inside a block as the start of a value and reclassifies the whole
//! thing as a selector if a `{` turns up before the terminating `;`.

use crate::error::{LexError, Span};
use crate::token::Token;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Body of a plain rule.
    Rule,
    /// Body of a block at-rule such as `@media`.
    AtBody,
    /// Between `@` and the terminating `{` or `;`.
    AtHeader,
    /// Right-hand side of `key:`.
    Value,
    SingleQuoted,
    DoubleQuoted,
    Comment,
}

impl State {
    /// States in which every character is taken literally.
    fn is_verbatim(self) -> bool {
        matches!(self, State::SingleQuoted | State::DoubleQuoted | State::Comment)
    }

    fn describe(self) -> &'static str {
        match self {
            State::Rule => "rule block",
            State::AtBody => "at-rule block",
            State::AtHeader => "at-rule",
            State::Value => "property value",
            State::SingleQuoted | State::DoubleQuoted => "string",
            State::Comment => "comment",
        }
    }
}

#[derive(Debug)]
struct Frame {
    state: State,
    line: usize,
}

/// Tokenize `source`. Line terminators are normalized to `\n` first.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    let tokens = Lexer::new(&normalized).run()?;
    tracing::trace!(count = tokens.len(), "lexed stylesheet");
    Ok(tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    span: Span,
    buffer: String,
    /// At-rule name or property key captured ahead of the buffer.
    key: Option<String>,
    /// Buffer set aside while a comment is being read.
    stashed: Option<String>,
    stack: Vec<Frame>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            span: Span::start(),
            buffer: String::new(),
            key: None,
            stashed: None,
            stack: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    self.buffer.push(ch);
                    if let Some(escaped) = self.bump() {
                        self.buffer.push(escaped);
                    }
                }
                '\n' | '\t' | '\u{b}' | '\u{c}' => {
                    if self.in_verbatim() {
                        self.buffer.push(ch);
                    } else {
                        self.space();
                    }
                }
                ' ' => self.space(),
                '{' => self.open_brace(),
                '}' => self.close_brace(),
                ':' => self.colon(),
                ';' => self.semicolon(),
                '/' => self.slash(),
                '*' => self.star(),
                '@' => self.at_sign(),
                '"' => self.quote(ch, State::DoubleQuoted),
                '\'' => self.quote(ch, State::SingleQuoted),
                ch if ch < ' ' => {
                    return Err(LexError::ControlCharacter {
                        ch,
                        span: self.span,
                    })
                }
                ch => self.buffer.push(ch),
            }
        }
        self.finish()
    }

    fn finish(self) -> Result<Vec<Token>, LexError> {
        if let Some(frame) = self.stack.last() {
            return Err(LexError::Unterminated {
                construct: frame.state.describe(),
                line: frame.line,
            });
        }
        if !self.buffer.trim().is_empty() {
            tracing::debug!(text = %self.buffer.trim(), "dropping trailing text with no block");
        }
        Ok(self.tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.pos)?;
        self.pos += 1;
        self.span.advance(ch);
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn state(&self) -> Option<State> {
        self.stack.last().map(|frame| frame.state)
    }

    fn in_verbatim(&self) -> bool {
        self.state().is_some_and(State::is_verbatim)
    }

    fn push(&mut self, state: State) {
        self.stack.push(Frame {
            state,
            line: self.span.line,
        });
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn emit(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    fn space(&mut self) {
        if self.state() == Some(State::AtHeader) && self.key.is_none() {
            self.key = Some(self.take_buffer());
        }
        self.buffer.push(' ');
    }

    fn open_brace(&mut self) {
        match self.state() {
            Some(state) if state.is_verbatim() => self.buffer.push('{'),
            Some(State::AtHeader) => {
                let (name, params) = self.take_header();
                let line = self.span.line;
                self.emit(Token::NestedAt { name, params, line });
                self.pop();
                self.push(State::AtBody);
            }
            Some(State::Value) => {
                // The colon belonged to a pseudo-class, not a declaration.
                self.pop();
                let key = self.key.take().unwrap_or_default();
                self.buffer = format!("{}:{}", key, self.buffer);
                self.open_rule();
            }
            _ => self.open_rule(),
        }
    }

    fn open_rule(&mut self) {
        let selector = self.take_buffer().trim().to_string();
        let line = self.span.line;
        self.emit(Token::Rule { selector, line });
        self.push(State::Rule);
    }

    fn close_brace(&mut self) {
        match self.state() {
            Some(state) if state.is_verbatim() => {
                self.buffer.push('}');
                return;
            }
            Some(State::Value) => {
                self.flush_property();
                self.pop();
            }
            Some(State::AtHeader) => {
                self.flush_at();
                self.pop();
            }
            _ => {}
        }

        if !self.buffer.trim().is_empty() {
            tracing::debug!(
                line = self.span.line,
                text = %self.buffer.trim(),
                "dropping text with no declaration"
            );
        }
        self.buffer.clear();

        let line = self.span.line;
        self.emit(Token::End { line });
        if matches!(self.state(), Some(State::Rule | State::AtBody)) {
            self.pop();
        }
    }

    fn colon(&mut self) {
        match self.state() {
            Some(State::Rule) => self.begin_value(),
            Some(State::AtBody) if self.selector_ahead() => self.buffer.push(':'),
            Some(State::AtBody) => self.begin_value(),
            _ => self.buffer.push(':'),
        }
    }

    /// Whether the next delimiter after the current position opens a block.
    fn selector_ahead(&self) -> bool {
        self.chars[self.pos..]
            .iter()
            .find(|c| matches!(**c, ';' | '}' | '{'))
            .is_some_and(|c| *c == '{')
    }

    fn begin_value(&mut self) {
        self.key = Some(self.take_buffer());
        self.push(State::Value);
    }

    fn semicolon(&mut self) {
        match self.state() {
            Some(state) if state.is_verbatim() => self.buffer.push(';'),
            Some(State::Value) => {
                self.flush_property();
                self.pop();
            }
            Some(State::AtHeader) => {
                self.flush_at();
                self.pop();
            }
            _ => {
                if !self.buffer.trim().is_empty() {
                    tracing::debug!(
                        line = self.span.line,
                        text = %self.buffer.trim(),
                        "dropping text before stray semicolon"
                    );
                }
                self.buffer.clear();
            }
        }
    }

    fn slash(&mut self) {
        if !self.in_verbatim() && self.peek() == Some('*') {
            self.bump();
            self.stashed = Some(self.take_buffer());
            self.push(State::Comment);
        } else {
            self.buffer.push('/');
        }
    }

    fn star(&mut self) {
        if self.state() == Some(State::Comment) && self.peek() == Some('/') {
            self.bump();
            let text = self.take_buffer().trim().to_string();
            let line = self.span.line;
            self.emit(Token::Comment { text, line });
            self.pop();
            self.buffer = self.stashed.take().unwrap_or_default();
        } else {
            self.buffer.push('*');
        }
    }

    fn at_sign(&mut self) {
        match self.state() {
            Some(state) if state.is_verbatim() => self.buffer.push('@'),
            Some(State::Value | State::AtHeader) => self.buffer.push('@'),
            _ => {
                if !self.buffer.trim().is_empty() {
                    tracing::debug!(
                        line = self.span.line,
                        text = %self.buffer.trim(),
                        "dropping text before at-rule"
                    );
                }
                self.buffer = String::from("@");
                self.key = None;
                self.push(State::AtHeader);
            }
        }
    }

    fn quote(&mut self, ch: char, kind: State) {
        match self.state() {
            Some(State::Comment) => {}
            Some(state) if state == kind => self.pop(),
            Some(State::SingleQuoted | State::DoubleQuoted) => {}
            _ => self.push(kind),
        }
        self.buffer.push(ch);
    }

    /// Split the pending at-rule into its name and params.
    fn take_header(&mut self) -> (String, String) {
        match self.key.take() {
            Some(name) => {
                let params = self.take_buffer().trim().to_string();
                (name.trim().to_string(), params)
            }
            None => (self.take_buffer().trim().to_string(), String::new()),
        }
    }

    fn flush_property(&mut self) {
        let key = self.key.take().unwrap_or_default().trim().to_string();
        let val = self.take_buffer().trim().to_string();
        let line = self.span.line;
        if key.is_empty() {
            tracing::debug!(line, text = %val, "dropping value with no property name");
            return;
        }
        self.emit(Token::Property { key, val, line });
    }

    fn flush_at(&mut self) {
        let (name, params) = self.take_header();
        let line = self.span.line;
        self.emit(Token::At { name, params, line });
    }
}
