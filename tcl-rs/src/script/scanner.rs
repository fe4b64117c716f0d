//! Finite-state scanner for statements and expressions.
//!
//! The scanner is a pull-based [`Iterator`] over [`Token`]s.  Each state
//! function consumes input, queues zero or more tokens, and returns the next
//! state; `next()` runs states until a token is queued.  The sequence always
//! ends with `Eof` or `Error`, after which the iterator is exhausted.
//!
//! Statement mode splits a script into words and `Eol` separators following
//! the language's quoting rules.  Expression mode (entered through
//! [`Scanner::expression`]) reuses the substitution states and adds numbers,
//! operators, parentheses, commas and function names.
//!
//! A double-quoted word scans as an alternating run of `Quote` fragments and
//! `Variable`/`Command` substitutions:
//!
//! ```text
//! "a $b [c] d"  →  Quote("a ") Variable($b) Quote(" ") Command([c]) Quote(" d")
//! ```
//!
//! The opening fragment (starting with `"`) and the closing fragment (ending
//! with `"`) are always emitted, even when their payload is empty.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use tracing::trace;

use super::token::{Token, TokenKind};

const MALFORMED_NUMBER: &str = "malformed number";

/// Which entry state the scanner starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Statement,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Command,
    Variable,
    Brace,
    Quote,
    QuoteBody,
    Word,
    Number,
    Operator,
    Function,
    Done,
}

/// Lazy token stream over a source string.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    start: usize,
    pos: usize,
    /// Byte width of the last char returned by `next_char`; 0 once backed up.
    width: usize,
    mode: Mode,
    state: State,
    /// Offset of the opening `"` while inside a quoted word.
    quote_start: Option<usize>,
    /// True at start of input and right after `Eol` (statement mode).
    command_start: bool,
    pending: VecDeque<Token<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, mode: Mode) -> Self {
        Scanner {
            input,
            start: 0,
            pos: 0,
            width: 0,
            mode,
            state: State::Start,
            quote_start: None,
            command_start: true,
            pending: VecDeque::new(),
        }
    }

    /// Scan a script: words, substitutions and `Eol` separators.
    pub fn statement(input: &'a str) -> Self {
        Self::new(input, Mode::Statement)
    }

    /// Scan an expression: operands, operators, parens, commas, functions.
    pub fn expression(input: &'a str) -> Self {
        Self::new(input, Mode::Expression)
    }

    // ── Cursor primitives ────────────────────────────────────────────────────

    fn next_char(&mut self) -> Option<char> {
        let ch = self.input[self.pos..].chars().next();
        self.width = ch.map_or(0, char::len_utf8);
        self.pos += self.width;
        ch
    }

    /// Step back over the last char read.  Only one step is remembered.
    fn backup(&mut self) {
        self.pos -= self.width;
        self.width = 0;
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    /// Consume chars while `pred` holds; returns how many were consumed.
    fn accept_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut n = 0;
        while let Some(c) = self.next_char() {
            if !pred(c) {
                self.backup();
                break;
            }
            n += 1;
        }
        n
    }

    fn emit(&mut self, kind: TokenKind) {
        debug_assert!(self.start <= self.pos && self.pos <= self.input.len());
        let tok = Token::new(kind, &self.input[self.start..self.pos], self.start);
        self.pending.push_back(tok);
        self.start = self.pos;
    }

    fn ignore(&mut self) {
        self.start = self.pos;
    }

    fn error(&mut self, message: &'static str) -> State {
        let offset = self.quote_start.take().unwrap_or(self.start);
        self.pending
            .push_back(Token::new(TokenKind::Error, message, offset));
        State::Done
    }

    /// Where to go after a substitution: back into the enclosing quoted word,
    /// or to the mode's start state.
    fn after_substitution(&self) -> State {
        if self.quote_start.is_some() {
            State::QuoteBody
        } else {
            State::Start
        }
    }

    // ── State dispatch ───────────────────────────────────────────────────────

    fn step(&mut self) -> State {
        match self.state {
            State::Start => match self.mode {
                Mode::Statement => self.lex_start(),
                Mode::Expression => self.lex_expr_start(),
            },
            State::Command => self.lex_command(),
            State::Variable => self.lex_variable(),
            State::Brace => self.lex_brace(),
            State::Quote => self.lex_quote(),
            State::QuoteBody => self.lex_quote_body(),
            State::Word => self.lex_word(),
            State::Number => self.lex_number(),
            State::Operator => self.lex_operator(),
            State::Function => self.lex_function(),
            State::Done => State::Done,
        }
    }

    fn lex_start(&mut self) -> State {
        let Some(c) = self.peek() else {
            self.emit(TokenKind::Eof);
            return State::Done;
        };
        match c {
            ' ' | '\t' | '\r' => {
                self.accept_while(is_separator);
                self.ignore();
                State::Start
            }
            '\n' | ';' => {
                self.accept_while(|c| c.is_whitespace() || c == ';');
                self.emit(TokenKind::Eol);
                self.command_start = true;
                State::Start
            }
            '#' if self.command_start => {
                self.accept_while(|c| c != '\n');
                self.ignore();
                State::Start
            }
            _ => {
                self.command_start = false;
                match c {
                    '[' => State::Command,
                    '$' => State::Variable,
                    '{' => State::Brace,
                    '"' => State::Quote,
                    _ => State::Word,
                }
            }
        }
    }

    fn lex_expr_start(&mut self) -> State {
        let Some(c) = self.peek() else {
            self.emit(TokenKind::Eof);
            return State::Done;
        };
        match c {
            ' ' | '\t' | '\r' => {
                self.accept_while(is_separator);
                self.ignore();
                State::Start
            }
            '[' => State::Command,
            '$' => State::Variable,
            '{' => State::Brace,
            '"' => State::Quote,
            '0'..='9' => State::Number,
            '.' if matches!(self.peek_second(), Some('0'..='9')) => State::Number,
            '(' | ')' => {
                self.next_char();
                self.emit(TokenKind::Paren);
                State::Start
            }
            ',' => {
                self.next_char();
                self.emit(TokenKind::Comma);
                State::Start
            }
            c if is_operator_char(c) => State::Operator,
            c if c.is_ascii_alphabetic() || c == '_' => State::Function,
            _ => self.error("illegal character in expression"),
        }
    }

    // ── Substitutions (both modes) ───────────────────────────────────────────

    fn lex_command(&mut self) -> State {
        self.next_char(); // '['
        let mut brackets = 1usize;
        let mut braces = 0usize;
        loop {
            match self.next_char() {
                None => return self.error("unclosed command"),
                Some('\\') => {
                    if self.next_char().is_none() {
                        return self.error("unclosed command");
                    }
                }
                Some('{') => braces += 1,
                Some('}') => braces = braces.saturating_sub(1),
                Some('[') if braces == 0 => brackets += 1,
                Some(']') if braces == 0 => {
                    brackets -= 1;
                    if brackets == 0 {
                        self.emit(TokenKind::Command);
                        return self.after_substitution();
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn lex_variable(&mut self) -> State {
        self.next_char(); // '$'
        if self.peek() == Some('{') {
            self.next_char();
            loop {
                match self.next_char() {
                    None => return self.error("unclosed variable"),
                    Some('}') => break,
                    Some(_) => {}
                }
            }
            self.emit(TokenKind::Variable);
        } else if self.accept_while(is_name_char) == 0 {
            // `$` followed by nothing nameable is just a dollar sign.
            self.emit(TokenKind::String);
        } else {
            self.emit(TokenKind::Variable);
        }
        self.after_substitution()
    }

    fn lex_brace(&mut self) -> State {
        self.next_char(); // '{'
        let mut depth = 1usize;
        loop {
            match self.next_char() {
                None => return self.error("unclosed left brace"),
                Some('\\') => {
                    if self.next_char().is_none() {
                        return self.error("unclosed left brace");
                    }
                }
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        self.emit(TokenKind::Brace);
                        return State::Start;
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn lex_quote(&mut self) -> State {
        self.quote_start = Some(self.pos);
        self.next_char(); // opening '"'
        State::QuoteBody
    }

    fn lex_quote_body(&mut self) -> State {
        loop {
            match self.peek() {
                None => return self.error("unclosed quoted string"),
                Some('\\') => {
                    self.next_char();
                    if self.next_char().is_none() {
                        return self.error("unclosed quoted string");
                    }
                }
                Some(c @ ('$' | '[')) => {
                    if self.pos > self.start {
                        self.emit(TokenKind::Quote);
                    }
                    return if c == '$' {
                        State::Variable
                    } else {
                        State::Command
                    };
                }
                Some('"') => {
                    self.next_char();
                    self.emit(TokenKind::Quote);
                    self.quote_start = None;
                    return State::Start;
                }
                Some(_) => {
                    self.next_char();
                }
            }
        }
    }

    // ── Statement-mode words ─────────────────────────────────────────────────

    fn lex_word(&mut self) -> State {
        loop {
            match self.peek() {
                None | Some('{' | '$' | '[' | ' ' | '\t' | '\r' | '\n' | ';') => break,
                Some('\\') => {
                    self.next_char();
                    self.next_char();
                }
                Some(_) => {
                    self.next_char();
                }
            }
        }
        self.emit(TokenKind::String);
        State::Start
    }

    // ── Expression-mode states ───────────────────────────────────────────────

    fn lex_number(&mut self) -> State {
        match scan_number(&self.input[self.pos..]) {
            Ok((kind, len)) => {
                self.pos += len;
                self.width = 0;
                self.emit(kind);
                State::Start
            }
            Err(message) => self.error(message),
        }
    }

    fn lex_operator(&mut self) -> State {
        let Some(first) = self.next_char() else {
            return self.error("illegal character in expression");
        };
        let doubled = matches!(
            (first, self.peek()),
            ('*', Some('*'))
                | ('<', Some('<' | '='))
                | ('>', Some('>' | '='))
                | ('&', Some('&'))
                | ('|', Some('|'))
                | ('=', Some('='))
                | ('!', Some('='))
        );
        if doubled {
            self.next_char();
        }
        self.emit(TokenKind::Operator);
        State::Start
    }

    fn lex_function(&mut self) -> State {
        self.accept_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let word = &self.input[self.start..self.pos];
        if matches!(word, "eq" | "ne" | "in" | "ni") {
            self.emit(TokenKind::Operator);
            return State::Start;
        }
        if self.peek() == Some('(') {
            self.emit(TokenKind::Function);
            State::Start
        } else {
            self.error("apparent function call missing (")
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                trace!(token = %tok, offset = tok.offset, "scanned");
                return Some(tok);
            }
            if self.state == State::Done {
                return None;
            }
            self.state = self.step();
        }
    }
}

impl FusedIterator for Scanner<'_> {}

// ── Number recognition ────────────────────────────────────────────────────────

/// Recognise a numeric literal at the start of `s`.
///
/// Returns the token kind (`Integer` or `Float`) and the byte length of the
/// literal.  Forms: `0x1f` (hex), `017` (octal), `42`, `4.2`, `.5`, `6E4`,
/// `1e-3`.  A literal directly followed by an alphanumeric, `_` or `.` is
/// malformed.  Digit validity for octal is checked on conversion, not here.
pub fn scan_number(s: &str) -> Result<(TokenKind, usize), &'static str> {
    let b = s.as_bytes();
    let run = |from: usize, pred: fn(&u8) -> bool| -> usize {
        from + b.get(from..).map_or(0, |rest| rest.iter().take_while(|&c| pred(c)).count())
    };

    let (kind, end) = if b.len() >= 2 && b[0] == b'0' && matches!(b[1], b'x' | b'X') {
        let end = run(2, u8::is_ascii_hexdigit);
        if end == 2 {
            return Err(MALFORMED_NUMBER);
        }
        (TokenKind::Integer, end)
    } else {
        let int_end = run(0, u8::is_ascii_digit);
        let mut end = int_end;
        let mut kind = TokenKind::Integer;
        if b.get(end) == Some(&b'.') {
            end = run(end + 1, u8::is_ascii_digit);
            kind = TokenKind::Float;
        }
        if int_end == 0 && end <= 1 {
            return Err(MALFORMED_NUMBER);
        }
        if matches!(b.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(b.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_end = run(exp, u8::is_ascii_digit);
            if exp_end == exp {
                return Err(MALFORMED_NUMBER);
            }
            end = exp_end;
            kind = TokenKind::Float;
        }
        (kind, end)
    };

    if matches!(b.get(end), Some(c) if c.is_ascii_alphanumeric() || *c == b'_' || *c == b'.') {
        return Err(MALFORMED_NUMBER);
    }
    Ok((kind, end))
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '-' | '+' | '~' | '!' | '*' | '/' | '%' | '<' | '>' | '=' | '&' | '^' | '|' | '?' | ':'
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
