use std::{fmt, mem};

use thiserror::Error;
use tracing::{trace, warn};

use crate::{options::Options, stack::ensure_sufficient_stack};

use super::{BinaryOperator, Expr, ExprKind, Span, UnaryOperator};

/// A construct that parses but cannot be transcribed meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidConstruct {
    EmptyNumerator,
    EmptyDenominator,
    EmptyRadicand,
    EmptyRootIndex,
    ZeroRootIndex,
    EmptyScript,
    EmptyGroup,
    /// Two numerals side by side, as in `2 3`, which would read as one number.
    AdjacentNumbers,
}

impl fmt::Display for InvalidConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            InvalidConstruct::EmptyNumerator => "empty fraction numerator",
            InvalidConstruct::EmptyDenominator => "empty fraction denominator",
            InvalidConstruct::EmptyRadicand => "empty radicand",
            InvalidConstruct::EmptyRootIndex => "empty root index",
            InvalidConstruct::ZeroRootIndex => "root index of zero",
            InvalidConstruct::EmptyScript => "empty superscript or subscript",
            InvalidConstruct::EmptyGroup => "empty group",
            InvalidConstruct::AdjacentNumbers => "adjacent numbers without an operator",
        };
        f.write_str(description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("{construct} at {span}")]
    InvalidConstruct {
        construct: InvalidConstruct,
        span: Span,
    },
    #[error("nesting deeper than {limit} levels at {span}")]
    TooDeeplyNested { limit: usize, span: Span },
}

impl SemanticError {
    pub fn span(&self) -> Span {
        match self {
            SemanticError::InvalidConstruct { span, .. }
            | SemanticError::TooDeeplyNested { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Division or a fraction with a literal zero divisor.
    DivisionByZero,
    /// An invalid construct let through because strict mode is off.
    Degraded(InvalidConstruct),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub span: Span,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::DivisionByZero => write!(f, "division by zero at {}", self.span),
            WarningKind::Degraded(construct) => write!(f, "{construct} at {}", self.span),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub expr: Expr,
    pub warnings: Vec<Warning>,
}

/// Resolves what the grammar leaves open and checks what it cannot:
///
/// - juxtaposed operands become implicit multiplication,
/// - a minus sign directly on a numeral folds into a negative number,
/// - degenerate constructs are rejected (or, outside strict mode, reported
///   as warnings and repaired where possible),
/// - `depth` annotations are filled in and nesting is held to
///   [`Options::max_nesting_depth`].
pub fn normalize(expr: Expr, options: &Options) -> Result<Normalized, SemanticError> {
    let mut normalizer = Normalizer {
        options,
        warnings: Vec::new(),
    };
    let expr = normalizer.visit(expr, Depth::default())?;
    trace!(warnings = normalizer.warnings.len(), "normalized");
    Ok(Normalized {
        expr,
        warnings: normalizer.warnings,
    })
}

/// Scopes enclosing the node being visited.
#[derive(Debug, Default, Clone, Copy)]
struct Depth {
    nesting: usize,
    fractions: usize,
    roots: usize,
    scripts: usize,
}

struct Normalizer<'o> {
    options: &'o Options,
    warnings: Vec<Warning>,
}

impl Normalizer<'_> {
    /// Enters a nested scope, failing once the configured limit is passed.
    fn nest(&self, depth: Depth, span: Span) -> Result<Depth, SemanticError> {
        let limit = self.options.max_nesting_depth;
        if depth.nesting >= limit {
            return Err(SemanticError::TooDeeplyNested { limit, span });
        }
        Ok(Depth {
            nesting: depth.nesting + 1,
            ..depth
        })
    }

    fn invalid(&mut self, construct: InvalidConstruct, span: Span) -> Result<(), SemanticError> {
        if self.options.strict_mode {
            return Err(SemanticError::InvalidConstruct { construct, span });
        }
        warn!(%construct, %span, "degrading invalid construct");
        self.warnings.push(Warning {
            kind: WarningKind::Degraded(construct),
            span,
        });
        Ok(())
    }

    fn check_empty(&mut self, expr: &Expr, construct: InvalidConstruct) -> Result<(), SemanticError> {
        if expr.is_empty() {
            self.invalid(construct, expr.span)?;
        }
        Ok(())
    }

    fn check_divisor(&mut self, divisor: &Expr, span: Span) {
        if divisor.is_literal_zero() {
            warn!(%span, "division by zero");
            self.warnings.push(Warning {
                kind: WarningKind::DivisionByZero,
                span,
            });
        }
    }

    fn visit(&mut self, expr: Expr, depth: Depth) -> Result<Expr, SemanticError> {
        ensure_sufficient_stack(|| self.visit_inner(expr, depth))
    }

    fn visit_boxed(&mut self, expr: Box<Expr>, depth: Depth) -> Result<Box<Expr>, SemanticError> {
        Ok(Box::new(self.visit(*expr, depth)?))
    }

    fn visit_inner(&mut self, mut expr: Expr, depth: Depth) -> Result<Expr, SemanticError> {
        let span = expr.span;
        let kind = match mem::replace(&mut expr.kind, ExprKind::Empty) {
            kind @ (ExprKind::Number { .. } | ExprKind::Variable(_)) => kind,
            ExprKind::Empty => {
                self.invalid(InvalidConstruct::EmptyGroup, span)?;
                ExprKind::Empty
            }
            ExprKind::BinaryOp {
                op,
                left,
                right,
                implicit,
            } => {
                if op == BinaryOperator::Divide {
                    self.check_divisor(&right, span);
                }
                ExprKind::BinaryOp {
                    op,
                    left: self.visit_boxed(left, depth)?,
                    right: self.visit_boxed(right, depth)?,
                    implicit,
                }
            }
            ExprKind::UnaryOp { op, operand } => {
                let mut operand = self.visit(*operand, depth)?;
                match mem::replace(&mut operand.kind, ExprKind::Empty) {
                    ExprKind::Number {
                        value,
                        negative: false,
                    } if op == UnaryOperator::Minus => ExprKind::Number {
                        value,
                        negative: true,
                    },
                    kind => {
                        operand.kind = kind;
                        ExprKind::UnaryOp {
                            op,
                            operand: Box::new(operand),
                        }
                    }
                }
            }
            ExprKind::Juxtaposition(left, right) => {
                return self.visit_juxtaposition(*left, *right, span, depth);
            }
            ExprKind::Fraction {
                numerator,
                denominator,
                ..
            } => {
                let inner = self.nest(depth, span)?;
                let inner = Depth {
                    fractions: inner.fractions + 1,
                    ..inner
                };
                self.check_empty(&numerator, InvalidConstruct::EmptyNumerator)?;
                self.check_empty(&denominator, InvalidConstruct::EmptyDenominator)?;
                self.check_divisor(&denominator, span);
                ExprKind::Fraction {
                    numerator: self.visit_slot(numerator, inner)?,
                    denominator: self.visit_slot(denominator, inner)?,
                    depth: inner.fractions,
                }
            }
            ExprKind::Root {
                index, radicand, ..
            } => {
                let inner = self.nest(depth, span)?;
                let inner = Depth {
                    roots: inner.roots + 1,
                    ..inner
                };
                let index = match index {
                    Some(index) if index.is_empty() => {
                        self.invalid(InvalidConstruct::EmptyRootIndex, index.span)?;
                        None
                    }
                    Some(index) if index.is_literal_zero() => {
                        self.invalid(InvalidConstruct::ZeroRootIndex, index.span)?;
                        None
                    }
                    Some(index) => Some(self.visit_boxed(index, inner)?),
                    None => None,
                };
                self.check_empty(&radicand, InvalidConstruct::EmptyRadicand)?;
                ExprKind::Root {
                    index,
                    radicand: self.visit_slot(radicand, inner)?,
                    depth: inner.roots,
                }
            }
            ExprKind::Power { base, exponent, .. } => {
                let base = self.visit_boxed(base, depth)?;
                if exponent.is_empty() {
                    self.invalid(InvalidConstruct::EmptyScript, exponent.span)?;
                    return Ok(*base);
                }
                let inner = self.nest(depth, span)?;
                let inner = Depth {
                    scripts: inner.scripts + 1,
                    ..inner
                };
                ExprKind::Power {
                    base,
                    exponent: self.visit_boxed(exponent, inner)?,
                    depth: inner.scripts,
                }
            }
            ExprKind::Subscript {
                base, subscript, ..
            } => {
                let base = self.visit_boxed(base, depth)?;
                if subscript.is_empty() {
                    self.invalid(InvalidConstruct::EmptyScript, subscript.span)?;
                    return Ok(*base);
                }
                let inner = self.nest(depth, span)?;
                let inner = Depth {
                    scripts: inner.scripts + 1,
                    ..inner
                };
                ExprKind::Subscript {
                    base,
                    subscript: self.visit_boxed(subscript, inner)?,
                    depth: inner.scripts,
                }
            }
            ExprKind::Function { name, argument } => {
                let inner = self.nest(depth, span)?;
                ExprKind::Function {
                    name,
                    argument: self.visit_boxed(argument, inner)?,
                }
            }
            ExprKind::Group(inner_expr) => {
                let inner = self.nest(depth, span)?;
                ExprKind::Group(self.visit_boxed(inner_expr, inner)?)
            }
        };
        Ok(Expr::new(kind, span))
    }

    /// Visits a fraction or root argument whose emptiness was already
    /// reported by the caller.
    fn visit_slot(&mut self, expr: Box<Expr>, depth: Depth) -> Result<Box<Expr>, SemanticError> {
        if expr.is_empty() {
            Ok(expr)
        } else {
            self.visit_boxed(expr, depth)
        }
    }

    fn visit_juxtaposition(
        &mut self,
        left: Expr,
        right: Expr,
        span: Span,
        depth: Depth,
    ) -> Result<Expr, SemanticError> {
        let left = self.visit(left, depth)?;
        let right = self.visit(right, depth)?;

        // Juxtaposing nothing is the other operand alone.
        if right.is_empty() {
            return Ok(left);
        }
        if left.is_empty() {
            return Ok(right);
        }

        // Nothing is written for an implicit product, so a numeral on the
        // right would extend a digit run the left side ends with.
        let adjacent_numbers = left.ends_with_numeral() && right.starts_with_numeral();
        if adjacent_numbers {
            self.invalid(InvalidConstruct::AdjacentNumbers, span)?;
        }

        Ok(Expr::new(
            ExprKind::BinaryOp {
                op: BinaryOperator::Multiply,
                left: Box::new(left),
                right: Box::new(right),
                implicit: !adjacent_numbers,
            },
            span,
        ))
    }
}
