use std::fmt;

use thiserror::Error;

/// Command names the scanner accepts, without the leading backslash.
pub const COMMANDS: &[&str] = &[
    "frac", "dfrac", "tfrac", "sqrt", "sin", "cos", "tan", "cot", "sec", "csc", "times", "div",
    "cdot", "left", "right",
];

const OPERATORS: &[char] = &['+', '-', '*', '/', '=', '^', '_'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    Ident,
    Operator,
    Command,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Source text of the token. Commands omit the backslash.
    pub lexeme: &'a str,
    /// Byte offset of the token's first character.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character {found:?} at offset {position}")]
    UnexpectedChar { position: usize, found: char },
    #[error("unknown command \\{name} at offset {position}")]
    UnknownCommand { position: usize, name: String },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position, .. } | LexError::UnknownCommand { position, .. } => {
                *position
            }
        }
    }
}

/// Splits LaTeX math source into tokens.
///
/// The scanner is a plain forward iterator; cloning it gives an independent
/// scanner that resumes from the same place.
#[derive(Debug, Clone)]
pub struct LatexScanner<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> LatexScanner<'a> {
    pub fn new(source: &'a str) -> Self {
        LatexScanner { source, offset: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn token(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let position = self.offset;
        let lexeme = &self.source[position..position + len];
        self.offset += len;
        Token {
            kind,
            lexeme,
            position,
        }
    }

    /// Skips whitespace, `$` delimiters and the spacing commands `\,` `\:`
    /// `\;` `\!` and `\ `.
    fn skip_blank(&mut self) {
        loop {
            let mut chars = self.rest().chars();
            match chars.next() {
                Some(c) if c.is_whitespace() || c == '$' => self.offset += c.len_utf8(),
                Some('\\') => match chars.next() {
                    Some(c @ (',' | ':' | ';' | '!' | ' ')) => self.offset += 1 + c.len_utf8(),
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn number(&mut self) -> Token<'a> {
        let rest = self.rest();
        let mut len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());

        // A decimal point only belongs to the number when digits follow it.
        let fraction = &rest[len..];
        if let Some(after_point) = fraction.strip_prefix('.') {
            let digits = after_point
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_point.len());
            if digits > 0 {
                len += 1 + digits;
            }
        }

        self.token(TokenKind::Number, len)
    }

    fn command(&mut self) -> Result<Token<'a>, LexError> {
        let position = self.offset;
        let name = &self.rest()[1..];
        let len = name
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(name.len());
        let name = &name[..len];

        // Either way the offending text is consumed, so iteration can go on.
        self.offset += 1 + len;
        if name.is_empty() {
            return Err(LexError::UnexpectedChar {
                position,
                found: '\\',
            });
        }
        if !COMMANDS.contains(&name) {
            return Err(LexError::UnknownCommand {
                position,
                name: name.to_owned(),
            });
        }

        Ok(Token {
            kind: TokenKind::Command,
            lexeme: name,
            position,
        })
    }
}

impl<'a> Iterator for LatexScanner<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_blank();

        let next = self.rest().chars().next()?;
        let token = match next {
            '0'..='9' => self.number(),
            '\\' => return Some(self.command()),
            'a'..='z' | 'A'..='Z' => self.token(TokenKind::Ident, 1),
            '{' => self.token(TokenKind::LBrace, 1),
            '}' => self.token(TokenKind::RBrace, 1),
            '(' => self.token(TokenKind::LParen, 1),
            ')' => self.token(TokenKind::RParen, 1),
            '[' => self.token(TokenKind::LBracket, 1),
            ']' => self.token(TokenKind::RBracket, 1),
            c if OPERATORS.contains(&c) => self.token(TokenKind::Operator, 1),
            found => {
                let error = LexError::UnexpectedChar {
                    position: self.offset,
                    found,
                };
                self.offset += found.len_utf8();
                return Some(Err(error));
            }
        };
        Some(Ok(token))
    }
}

/// Scans the whole source, failing on the first lexical error. The returned
/// list always ends with a single [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    for token in LatexScanner::new(source) {
        tokens.push(token?);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: "",
        position: source.len(),
    });
    Ok(tokens)
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Command => write!(f, "\\{}", self.lexeme),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.lexeme))
            .collect()
    }

    #[test]
    fn test_scanner() {
        assert_eq!(
            kinds(r"12 + \frac{x}{3}"),
            vec![
                (TokenKind::Number, "12"),
                (TokenKind::Operator, "+"),
                (TokenKind::Command, "frac"),
                (TokenKind::LBrace, "{"),
                (TokenKind::Ident, "x"),
                (TokenKind::RBrace, "}"),
                (TokenKind::LBrace, "{"),
                (TokenKind::Number, "3"),
                (TokenKind::RBrace, "}"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("1 +  23").unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2, 5, 7]);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(
            kinds("3.14"),
            vec![(TokenKind::Number, "3.14"), (TokenKind::Eof, "")]
        );
        assert_eq!(
            tokenize("3."),
            Err(LexError::UnexpectedChar {
                position: 1,
                found: '.'
            })
        );
    }

    #[test]
    fn test_identifiers_are_single_letters() {
        assert_eq!(
            kinds("ab"),
            vec![
                (TokenKind::Ident, "a"),
                (TokenKind::Ident, "b"),
                (TokenKind::Eof, "")
            ]
        );
    }

    #[test]
    fn test_command_needs_separator() {
        assert_eq!(
            kinds(r"\sin x"),
            vec![
                (TokenKind::Command, "sin"),
                (TokenKind::Ident, "x"),
                (TokenKind::Eof, "")
            ]
        );
        assert_eq!(
            tokenize(r"1 + \sinx"),
            Err(LexError::UnknownCommand {
                position: 4,
                name: "sinx".to_owned()
            })
        );
    }

    #[test]
    fn test_skips_delimiters_and_spacing() {
        assert_eq!(
            kinds(r"$1\,+\;2$"),
            vec![
                (TokenKind::Number, "1"),
                (TokenKind::Operator, "+"),
                (TokenKind::Number, "2"),
                (TokenKind::Eof, "")
            ]
        );
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            tokenize("2 # 3"),
            Err(LexError::UnexpectedChar {
                position: 2,
                found: '#'
            })
        );
        assert_eq!(
            tokenize("1+\\"),
            Err(LexError::UnexpectedChar {
                position: 2,
                found: '\\'
            })
        );
    }

    #[test]
    fn test_scanner_restarts_from_clone() {
        let mut scanner = LatexScanner::new("1 + 2");
        scanner.next();
        let resumed: Vec<_> = scanner.clone().map(|t| t.unwrap().lexeme).collect();
        assert_eq!(resumed, vec!["+", "2"]);
        assert_eq!(scanner.offset(), 1);
    }

    #[test]
    fn test_display() {
        let tokens = tokenize(r"\sqrt{2}").unwrap();
        let rendered: Vec<_> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["\\sqrt", "{", "2", "}", "end of input"]);
    }
}
