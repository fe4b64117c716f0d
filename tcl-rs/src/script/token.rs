//! Tokens produced by the [`Scanner`](super::scanner::Scanner).

use std::fmt;

/// Classification of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Scan failure; the token text is the message.  Always the last token.
    Error,
    /// Bare word (statement mode), or a lone `$` that names nothing.
    String,
    /// Fragment of a double-quoted word, delimited by the quotes or by an
    /// embedded `$`/`[` substitution.
    Quote,
    /// `{...}` literal, never substituted.
    Brace,
    /// `[...]` command substitution.
    Command,
    /// `$name` or `${name}`.
    Variable,
    /// Identifier immediately followed by `(` (expression mode).
    Function,
    Operator,
    Integer,
    Float,
    Comma,
    Paren,
    /// End of a statement (`\n` or `;` run).
    Eol,
    Eof,
}

/// A classified slice of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw source text, delimiters included.
    pub text: &'a str,
    /// Byte offset of `text` within the scanned input.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, offset: usize) -> Self {
        Token { kind, text, offset }
    }

    /// Byte offset just past the end of this token.
    pub fn end(&self) -> usize {
        match self.kind {
            // Error text is a message, not a slice of the input.
            TokenKind::Error => self.offset,
            _ => self.offset + self.text.len(),
        }
    }

    /// The token payload with its delimiters stripped.
    ///
    /// | Kind       | Raw          | Contents |
    /// |------------|--------------|----------|
    /// | `Brace`    | `{a b}`      | `a b`    |
    /// | `Command`  | `[cmd x]`    | `cmd x`  |
    /// | `Variable` | `$x`, `${x}` | `x`      |
    /// | `Quote`    | `"abc`       | `abc`    |
    /// | `Eof`      | (empty)      | (empty)  |
    pub fn contents(&self) -> &'a str {
        let t = self.text;
        match self.kind {
            TokenKind::Brace => strip_pair(t, '{', '}'),
            TokenKind::Command => strip_pair(t, '[', ']'),
            TokenKind::Variable => {
                let name = t.strip_prefix('$').unwrap_or(t);
                match name.strip_prefix('{') {
                    Some(inner) => inner.strip_suffix('}').unwrap_or(inner),
                    None => name,
                }
            }
            TokenKind::Quote => {
                let body = t.strip_prefix('"').unwrap_or(t);
                if ends_with_unescaped_quote(body) {
                    &body[..body.len() - 1]
                } else {
                    body
                }
            }
            TokenKind::Eof => "",
            _ => t,
        }
    }

    /// Whether this `Quote` fragment ends its quoted word.
    ///
    /// `opening` must be true for the first fragment of a word, whose leading
    /// `"` is the opening delimiter and cannot also close it.
    pub fn closes_quote(&self, opening: bool) -> bool {
        if self.kind != TokenKind::Quote {
            return false;
        }
        let body = if opening {
            self.text.strip_prefix('"').unwrap_or(self.text)
        } else {
            self.text
        };
        ends_with_unescaped_quote(body)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::Error)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Eol => write!(f, "EOL"),
            TokenKind::Error => write!(f, "error: {}", self.text),
            kind => write!(f, "{kind:?}({:?})", self.text),
        }
    }
}

fn strip_pair(t: &str, open: char, close: char) -> &str {
    let inner = t.strip_prefix(open).unwrap_or(t);
    inner.strip_suffix(close).unwrap_or(inner)
}

/// True when `s` ends in a `"` preceded by an even number of backslashes.
fn ends_with_unescaped_quote(s: &str) -> bool {
    let Some(head) = s.strip_suffix('"') else {
        return false;
    };
    let backslashes = head.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
