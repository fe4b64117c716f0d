//! Script splitting: commands and words.
//!
//! A script is a sequence of commands separated by newlines or `;`.  Each
//! command is a list of words; a word is one or more tokens that touch in the
//! source (`a$b[c]` is one word of three tokens).  Nothing is substituted
//! here; callers decide what to do with variable and command tokens.

use super::error::EvalError;
use super::scanner::Scanner;
use super::token::{Token, TokenKind};

/// One word of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word<'a> {
    /// Source text of the whole word, quotes and braces included.
    pub text: &'a str,
    pub offset: usize,
    pub parts: Vec<Token<'a>>,
}

impl<'a> Word<'a> {
    /// The word's value when it needs no substitution: a bare word, a braced
    /// word, or a quoted word without `$`/`[`.  Backslash escapes are left
    /// as written.
    pub fn literal(&self) -> Option<&'a str> {
        match self.parts.as_slice() {
            [tok] => match tok.kind {
                TokenKind::String | TokenKind::Brace => Some(tok.contents()),
                TokenKind::Quote if tok.closes_quote(true) => Some(tok.contents()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A command: its words in order.  Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub words: Vec<Word<'a>>,
}

impl<'a> Command<'a> {
    /// The command name, when the first word is literal.
    pub fn name(&self) -> Option<&'a str> {
        self.words.first().and_then(Word::literal)
    }

    pub fn offset(&self) -> usize {
        self.words.first().map_or(0, |w| w.offset)
    }
}

/// Split `src` into commands.
///
/// Empty commands (blank lines, runs of `;`, comment lines) are dropped.  A
/// scan failure anywhere fails the whole script.
pub fn parse_script(src: &str) -> Result<Vec<Command<'_>>, EvalError> {
    let mut commands = Vec::new();
    let mut words: Vec<Word<'_>> = Vec::new();

    for tok in Scanner::statement(src) {
        match tok.kind {
            TokenKind::Error => {
                return Err(EvalError::Lex {
                    message: tok.text.to_owned(),
                    offset: tok.offset,
                })
            }
            TokenKind::Eol | TokenKind::Eof => {
                if !words.is_empty() {
                    commands.push(Command {
                        words: std::mem::take(&mut words),
                    });
                }
            }
            _ => {
                let touching = words
                    .last()
                    .is_some_and(|w| w.offset + w.text.len() == tok.offset);
                if touching {
                    if let Some(word) = words.last_mut() {
                        word.text = &src[word.offset..tok.end()];
                        word.parts.push(tok);
                    }
                } else {
                    words.push(Word {
                        text: tok.text,
                        offset: tok.offset,
                        parts: vec![tok],
                    });
                }
            }
        }
    }
    Ok(commands)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(cmd: &Command<'a>) -> Vec<&'a str> {
        cmd.words.iter().map(|w| w.text).collect()
    }

    #[test]
    fn splits_commands() {
        let cmds = parse_script("set x 1\nputs $x; incr x").unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(texts(&cmds[0]), vec!["set", "x", "1"]);
        assert_eq!(texts(&cmds[1]), vec!["puts", "$x"]);
        assert_eq!(texts(&cmds[2]), vec!["incr", "x"]);
        assert_eq!(cmds[2].offset(), 17);
    }

    #[test]
    fn drops_empty_commands_and_comments() {
        let cmds = parse_script("\n\n# comment\n;;  a\n\n").unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].name(), Some("a"));
        assert!(parse_script("").unwrap().is_empty());
    }

    #[test]
    fn adjacent_tokens_form_one_word() {
        let cmds = parse_script("puts a$b[c]d {x y}").unwrap();
        let word = &cmds[0].words[1];
        assert_eq!(word.text, "a$b[c]d");
        assert_eq!(word.parts.len(), 4);
        assert_eq!(word.parts[1].kind, TokenKind::Variable);
        assert_eq!(word.parts[2].kind, TokenKind::Command);
        assert_eq!(word.literal(), None);
        assert_eq!(cmds[0].words[2].literal(), Some("x y"));
    }

    #[test]
    fn quoted_words() {
        let cmds = parse_script("puts \"a $b c\" \"plain\"").unwrap();
        assert_eq!(texts(&cmds[0]), vec!["puts", "\"a $b c\"", "\"plain\""]);
        assert_eq!(cmds[0].words[1].literal(), None);
        assert_eq!(cmds[0].words[2].literal(), Some("plain"));
    }

    #[test]
    fn command_name_needs_literal() {
        let cmds = parse_script("$cmd arg").unwrap();
        assert_eq!(cmds[0].name(), None);
    }

    #[test]
    fn scan_errors_fail_the_script() {
        assert_eq!(
            parse_script("set x {unclosed"),
            Err(EvalError::Lex {
                message: "unclosed left brace".into(),
                offset: 6,
            })
        );
    }
}
