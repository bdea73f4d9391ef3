use thiserror::Error;
use tracing::trace;

use crate::stack::ensure_sufficient_stack;

use super::{
    scanner::{tokenize, LexError, Token, TokenKind},
    BinaryOperator, Expr, ExprKind, Function, Span, UnaryOperator,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("expected {expected} at offset {position}, found {found}")]
    Unexpected {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("unclosed `{delimiter}` opened at offset {open}: expected `{expected}` at offset {position}, found {found}")]
    Unclosed {
        open: usize,
        delimiter: char,
        expected: char,
        position: usize,
        found: String,
    },
}

impl SyntaxError {
    /// The offset to report. For an unbalanced delimiter this is where the
    /// delimiter was opened.
    pub fn position(&self) -> usize {
        match self {
            SyntaxError::Unexpected { position, .. } => *position,
            SyntaxError::Unclosed { open, .. } => *open,
        }
    }
}

/// Either stage of reading LaTeX source failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Tokenizes and parses `source` in one step.
pub fn parse_latex(source: &str) -> Result<Expr, ReadError> {
    let tokens = tokenize(source)?;
    Ok(parse(&tokens)?)
}

/// Parses a token list, as produced by [`tokenize`], into an expression tree.
pub fn parse(tokens: &[Token]) -> Result<Expr, SyntaxError> {
    trace!(tokens = tokens.len(), "parsing");
    let mut parser = Parser::new(tokens);
    let expr = parser.equation()?;
    match parser.peek().kind {
        TokenKind::Eof => Ok(expr),
        _ => Err(parser.unexpected("an operator or end of input")),
    }
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    eof: Token<'a>,
    /// End offset of the last consumed token.
    prev_end: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        let end = tokens.last().map_or(0, token_end);
        Parser {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                lexeme: "",
                position: end,
            },
            prev_end: 0,
        }
    }

    fn peek(&self) -> Token<'a> {
        self.tokens.get(self.pos).copied().unwrap_or(self.eof)
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.prev_end = token_end(&token);
        }
        token
    }

    fn at_operator(&self, symbols: &[&str]) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Operator && symbols.contains(&token.lexeme)
    }

    fn at_command(&self, names: &[&str]) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Command && names.contains(&token.lexeme)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let found = self.peek();
        SyntaxError::Unexpected {
            position: found.position,
            expected: expected.to_owned(),
            found: describe(&found),
        }
    }

    /// Consumes the closing delimiter matching `open`.
    fn close(
        &mut self,
        open: Token<'a>,
        kind: TokenKind,
        expected: char,
    ) -> Result<(), SyntaxError> {
        let found = self.peek();
        if found.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(SyntaxError::Unclosed {
                open: open.position,
                delimiter: open.lexeme.chars().next().unwrap_or(expected),
                expected,
                position: found.position,
                found: describe(&found),
            })
        }
    }

    fn equation(&mut self) -> Result<Expr, SyntaxError> {
        ensure_sufficient_stack(|| {
            let mut left = self.sum()?;
            while self.at_operator(&["="]) {
                self.advance();
                let right = self.sum()?;
                left = binary(BinaryOperator::Equals, left, right);
            }
            Ok(left)
        })
    }

    fn sum(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.product()?;
        loop {
            let op = if self.at_operator(&["+"]) {
                BinaryOperator::Add
            } else if self.at_operator(&["-"]) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            self.advance();
            let right = self.product()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn product(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.signed()?;
        loop {
            let token = self.peek();
            let op = match (token.kind, token.lexeme) {
                (TokenKind::Operator, "*") | (TokenKind::Command, "times") => {
                    Some(BinaryOperator::Multiply)
                }
                (TokenKind::Operator, "/") | (TokenKind::Command, "div") => {
                    Some(BinaryOperator::Divide)
                }
                (TokenKind::Command, "cdot") => Some(BinaryOperator::Dot),
                _ => None,
            };

            if let Some(op) = op {
                self.advance();
                let right = self.signed()?;
                left = binary(op, left, right);
            } else if self.starts_operand() {
                let right = self.script()?;
                left = juxtapose(left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// Whether the next token can begin an operand written directly after
    /// another one, as in `2x` or `)(`.
    fn starts_operand(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Number | TokenKind::Ident | TokenKind::LParen | TokenKind::LBrace => true,
            TokenKind::Command => !matches!(token.lexeme, "times" | "div" | "cdot" | "right"),
            _ => false,
        }
    }

    fn signed(&mut self) -> Result<Expr, SyntaxError> {
        ensure_sufficient_stack(|| {
            let token = self.peek();
            let op = match (token.kind, token.lexeme) {
                (TokenKind::Operator, "+") => UnaryOperator::Plus,
                (TokenKind::Operator, "-") => UnaryOperator::Minus,
                _ => return self.script(),
            };
            self.advance();
            let operand = self.signed()?;
            let span = Span::new(token.position, operand.span.end);
            Ok(Expr::new(
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ))
        })
    }

    /// A primary followed by any number of `^` and `_` scripts.
    fn script(&mut self) -> Result<Expr, SyntaxError> {
        let mut base = self.primary()?;
        while self.at_operator(&["^", "_"]) {
            let op = self.advance().lexeme;
            let argument = self.script_argument(op)?;
            base = scripted(op, base, argument);
        }
        Ok(base)
    }

    /// The argument of a script: one primary. A repeat of the same script
    /// operator nests to the right, so `a^b^c` reads as `a^(b^c)`.
    fn script_argument(&mut self, op: &str) -> Result<Expr, SyntaxError> {
        ensure_sufficient_stack(|| {
            let argument = self.primary()?;
            if self.at_operator(&[op]) {
                self.advance();
                let inner = self.script_argument(op)?;
                Ok(scripted(op, argument, inner))
            } else {
                Ok(argument)
            }
        })
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek();
        let span = Span::new(token.position, token_end(&token));
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::number(token.lexeme, span))
            }
            TokenKind::Ident => {
                self.advance();
                let c = token.lexeme.chars().next().unwrap_or('?');
                Ok(Expr::new(ExprKind::Variable(c), span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.equation()?;
                self.close(token, TokenKind::RParen, ')')?;
                Ok(Expr::new(
                    ExprKind::Group(Box::new(inner)),
                    Span::new(token.position, self.prev_end),
                ))
            }
            TokenKind::LBrace => self.braced(),
            TokenKind::Command => self.command(token),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `{...}`. Braces group without leaving a node of their own, except that
    /// `{}` becomes [`ExprKind::Empty`].
    fn braced(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.advance();
        if self.peek().kind == TokenKind::RBrace {
            let close = self.advance();
            return Ok(Expr::new(
                ExprKind::Empty,
                Span::new(open.position, token_end(&close)),
            ));
        }
        let inner = self.equation()?;
        self.close(open, TokenKind::RBrace, '}')?;
        Ok(inner)
    }

    /// A braced argument that a command cannot do without.
    fn required_braced(&mut self, command: &str) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::LBrace {
            self.braced()
        } else {
            Err(self.unexpected(&format!("`{{` to open an argument of \\{command}")))
        }
    }

    fn command(&mut self, token: Token<'a>) -> Result<Expr, SyntaxError> {
        let start = token.position;
        match token.lexeme {
            "frac" | "dfrac" | "tfrac" => {
                self.advance();
                let numerator = self.required_braced(token.lexeme)?;
                let denominator = self.required_braced(token.lexeme)?;
                Ok(Expr::new(
                    ExprKind::Fraction {
                        numerator: Box::new(numerator),
                        denominator: Box::new(denominator),
                        depth: 0,
                    },
                    Span::new(start, self.prev_end),
                ))
            }
            "sqrt" => {
                self.advance();
                let index = if self.peek().kind == TokenKind::LBracket {
                    let open = self.advance();
                    let index = if self.peek().kind == TokenKind::RBracket {
                        let close = self.peek();
                        Expr::new(ExprKind::Empty, Span::new(open.position, token_end(&close)))
                    } else {
                        self.equation()?
                    };
                    self.close(open, TokenKind::RBracket, ']')?;
                    Some(Box::new(index))
                } else {
                    None
                };
                let radicand = self.required_braced("sqrt")?;
                Ok(Expr::new(
                    ExprKind::Root {
                        index,
                        radicand: Box::new(radicand),
                        depth: 0,
                    },
                    Span::new(start, self.prev_end),
                ))
            }
            "left" => {
                self.advance();
                let open = self.peek();
                if open.kind != TokenKind::LParen {
                    return Err(self.unexpected("`(` after \\left"));
                }
                self.advance();
                let inner = self.equation()?;
                if !self.at_command(&["right"]) {
                    return Err(SyntaxError::Unclosed {
                        open: open.position,
                        delimiter: '(',
                        expected: ')',
                        position: self.peek().position,
                        found: describe(&self.peek()),
                    });
                }
                self.advance();
                self.close(open, TokenKind::RParen, ')')?;
                Ok(Expr::new(
                    ExprKind::Group(Box::new(inner)),
                    Span::new(start, self.prev_end),
                ))
            }
            name => match Function::from_command(name) {
                Some(function) => {
                    self.advance();
                    let argument = self.function_argument()?;
                    let span = Span::new(start, argument.span.end);
                    Ok(Expr::new(
                        ExprKind::Function {
                            name: function,
                            argument: Box::new(argument),
                        },
                        span,
                    ))
                }
                None => Err(self.unexpected("an expression")),
            },
        }
    }

    /// The argument of `\sin` and friends. A parenthesised argument stands on
    /// its own; otherwise the argument runs over juxtaposed operands, so
    /// `\sin 2x` is `\sin(2x)`, and stops at the next function.
    fn function_argument(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::LParen {
            return self.script();
        }

        let mut argument = self.signed()?;
        while self.starts_operand() && !self.at_function() {
            let right = self.script()?;
            argument = juxtapose(argument, right);
        }
        Ok(argument)
    }

    fn at_function(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Command && Function::from_command(token.lexeme).is_some()
    }
}

fn token_end(token: &Token) -> usize {
    match token.kind {
        TokenKind::Command => token.position + 1 + token.lexeme.len(),
        _ => token.position + token.lexeme.len(),
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => token.to_string(),
        _ => format!("`{token}`"),
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            implicit: false,
        },
        span,
    )
}

fn juxtapose(left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Juxtaposition(Box::new(left), Box::new(right)),
        span,
    )
}

fn scripted(op: &str, base: Expr, argument: Expr) -> Expr {
    let span = base.span.to(argument.span);
    let kind = if op == "^" {
        ExprKind::Power {
            base: Box::new(base),
            exponent: Box::new(argument),
            depth: 0,
        }
    } else {
        ExprKind::Subscript {
            base: Box::new(base),
            subscript: Box::new(argument),
            depth: 0,
        }
    };
    Expr::new(kind, span)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn structure(source: &str) -> String {
        parse_latex(source).unwrap().to_string()
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match parse_latex(source) {
            Err(ReadError::Syntax(error)) => error,
            other => panic!("expected a syntax error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(structure("2 + 3 * 4"), "(2 + (3 * 4))");
        assert_eq!(structure("10 - 6 / 2"), "(10 - (6 / 2))");
        assert_eq!(structure("(2 + 3) * 4"), "([(2 + 3)] * 4)");
        assert_eq!(structure("7 - 3 + 1"), "((7 - 3) + 1)");
        assert_eq!(structure("1 + 2 = 3"), "((1 + 2) = 3)");
    }

    #[test]
    fn test_commands_as_operators() {
        assert_eq!(structure(r"6 \times 7 \div 2"), "((6 * 7) / 2)");
        assert_eq!(structure(r"a \cdot b"), "(a \\cdot b)");
    }

    #[test]
    fn test_unary() {
        assert_eq!(structure("-3 + 4"), "((-3) + 4)");
        assert_eq!(structure("2 * -x"), "(2 * (-x))");
        assert_eq!(structure("--1"), "(-(-1))");
    }

    #[test]
    fn test_juxtaposition() {
        let expr = parse_latex("2x").unwrap();
        assert!(matches!(expr.kind, ExprKind::Juxtaposition(_, _)));
        assert_eq!(structure("2x + 1"), "((2 x) + 1)");
        assert_eq!(structure("(a)(b)"), "([a] [b])");
        assert_eq!(structure("3ab"), "((3 a) b)");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(structure("2^3^4"), "(2^(3^4))");
        assert_eq!(structure("{2^3}^4"), "((2^3)^4)");
        assert_eq!(structure("a_i_j"), "(a_(i_j))");
    }

    #[test]
    fn test_scripts_bind_to_preceding_primary() {
        assert_eq!(structure("2x^2"), "(2 (x^2))");
        assert_eq!(structure("x^{n+1}"), "(x^(n + 1))");
        assert_eq!(structure("x_1^2"), "((x_1)^2)");
        assert_eq!(structure("-x^2"), "(-(x^2))");
    }

    #[test]
    fn test_fraction_and_root() {
        assert_eq!(structure(r"\frac{1}{2}"), "\\frac{1}{2}");
        assert_eq!(structure(r"\dfrac{a+b}{c}"), "\\frac{(a + b)}{c}");
        assert_eq!(structure(r"\sqrt{x}"), "\\sqrt{x}");
        assert_eq!(structure(r"\sqrt[3]{8}"), "\\sqrt[3]{8}");
        assert_eq!(structure(r"\frac{}{2}"), "\\frac{{}}{2}");
    }

    #[test]
    fn test_functions() {
        assert_eq!(structure(r"\sin x"), "\\sin x");
        assert_eq!(structure(r"\sin 2x + 1"), "(\\sin (2 x) + 1)");
        assert_eq!(structure(r"\sin(a+b)c"), "(\\sin [(a + b)] c)");
        assert_eq!(structure(r"\sin x \cos y"), "(\\sin x \\cos y)");
        assert_eq!(structure(r"\cos -x"), "\\cos (-x)");
    }

    #[test]
    fn test_left_right() {
        assert_eq!(structure(r"\left(1+2\right)3"), "([(1 + 2)] 3)");
    }

    #[test]
    fn test_spans() {
        let expr = parse_latex(r"1 + \frac{2}{3}").unwrap();
        assert_eq!(expr.span, Span::new(0, 15));
        let ExprKind::BinaryOp { right, .. } = &expr.kind else {
            panic!("expected a binary operation");
        };
        assert_eq!(right.span, Span::new(4, 15));
    }

    #[test]
    fn test_unclosed_brace_names_opening() {
        assert_eq!(
            syntax_error(r"\frac{1}{2"),
            SyntaxError::Unclosed {
                open: 8,
                delimiter: '{',
                expected: '}',
                position: 10,
                found: "end of input".to_owned(),
            }
        );
        assert_eq!(syntax_error("(1+2").position(), 0);
        assert_eq!(syntax_error("3*(1+2}").position(), 2);
        assert_eq!(syntax_error(r"\sqrt[3{8}").position(), 5);
    }

    #[test]
    fn test_stray_closer() {
        assert_eq!(
            syntax_error("1+2)"),
            SyntaxError::Unexpected {
                position: 3,
                expected: "an operator or end of input".to_owned(),
                found: "`)`".to_owned(),
            }
        );
        assert_eq!(syntax_error("}").position(), 0);
    }

    #[test]
    fn test_unbraced_fraction_is_rejected() {
        assert_eq!(
            syntax_error(r"\frac 1 2"),
            SyntaxError::Unexpected {
                position: 6,
                expected: "`{` to open an argument of \\frac".to_owned(),
                found: "`1`".to_owned(),
            }
        );
        assert!(matches!(
            syntax_error(r"\sqrt x"),
            SyntaxError::Unexpected { position: 6, .. }
        ));
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(syntax_error("").position(), 0);
        assert_eq!(syntax_error("1 +").position(), 3);
        assert_eq!(syntax_error("()").position(), 1);
        assert_eq!(syntax_error("x^").position(), 2);
        assert_eq!(syntax_error(r"\sin").position(), 4);
        assert_eq!(syntax_error(r"2 \times").position(), 8);
    }

    #[test]
    fn test_lex_errors_pass_through() {
        assert!(matches!(
            parse_latex(r"\alpha"),
            Err(ReadError::Lex(LexError::UnknownCommand { .. }))
        ));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 2_000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_latex(&source).is_ok());
    }
}
