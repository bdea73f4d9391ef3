use std::{
    fmt::{self, Write},
    mem,
};

use crate::stack::ensure_sufficient_stack;

pub mod normalize;
pub mod parser;
pub mod scanner;

/// Byte range of the source a node was parsed from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A node of the expression tree.
///
/// Long flat chains such as `1+1+...+1` nest one level per operator, so the
/// recursive trait impls below grow the stack as they go and dropping a tree
/// walks it iteratively.
#[derive(Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        ensure_sufficient_stack(|| Expr {
            kind: self.kind.clone(),
            span: self.span,
        })
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        ensure_sufficient_stack(|| self.span == other.span && self.kind == other.kind)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| {
            f.debug_struct("Expr")
                .field("kind", &self.kind)
                .field("span", &self.span)
                .finish()
        })
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.kind.take_children(&mut pending);
        while let Some(mut child) = pending.pop() {
            child.kind.take_children(&mut pending);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Number {
        value: String,
        negative: bool,
    },
    Variable(char),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        implicit: bool,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Two operands written side by side. Only the parser produces this; the
    /// normalizer rewrites it into an implicit multiplication.
    Juxtaposition(Box<Expr>, Box<Expr>),
    /// `depth` fields count enclosing constructs of the same kind, this one
    /// included. The normalizer fills them in; the parser leaves them at 0.
    /// The encoder counts depths itself and only checks them against these.
    Fraction {
        numerator: Box<Expr>,
        denominator: Box<Expr>,
        depth: usize,
    },
    Power {
        base: Box<Expr>,
        exponent: Box<Expr>,
        depth: usize,
    },
    Subscript {
        base: Box<Expr>,
        subscript: Box<Expr>,
        depth: usize,
    },
    Root {
        index: Option<Box<Expr>>,
        radicand: Box<Expr>,
        depth: usize,
    },
    Function {
        name: Function,
        argument: Box<Expr>,
    },
    Group(Box<Expr>),
    /// The contents of `{}`.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Dot,
    Divide,
    Equals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Dot => "\\cdot",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equals => "=",
        }
    }
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        }
    }
}

impl Function {
    pub fn from_command(name: &str) -> Option<Function> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "cot" => Some(Function::Cot),
            "sec" => Some(Function::Sec),
            "csc" => Some(Function::Csc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Cot => "cot",
            Function::Sec => "sec",
            Function::Csc => "csc",
        }
    }
}

impl ExprKind {
    /// Moves the direct children out, leaving `Empty` behind.
    fn take_children(&mut self, out: &mut Vec<Box<Expr>>) {
        match mem::replace(self, ExprKind::Empty) {
            ExprKind::Number { .. } | ExprKind::Variable(_) | ExprKind::Empty => {}
            ExprKind::BinaryOp { left, right, .. } | ExprKind::Juxtaposition(left, right) => {
                out.push(left);
                out.push(right);
            }
            ExprKind::UnaryOp { operand: child, .. }
            | ExprKind::Function { argument: child, .. }
            | ExprKind::Group(child) => out.push(child),
            ExprKind::Fraction {
                numerator: first,
                denominator: second,
                ..
            }
            | ExprKind::Power {
                base: first,
                exponent: second,
                ..
            }
            | ExprKind::Subscript {
                base: first,
                subscript: second,
                ..
            } => {
                out.push(first);
                out.push(second);
            }
            ExprKind::Root {
                index, radicand, ..
            } => {
                out.extend(index);
                out.push(radicand);
            }
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn number(value: impl Into<String>, span: Span) -> Self {
        Expr::new(
            ExprKind::Number {
                value: value.into(),
                negative: false,
            },
            span,
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ExprKind::Empty)
    }

    /// Whether this is an unsigned literal whose value is zero (`0`, `0.00`).
    pub fn is_literal_zero(&self) -> bool {
        let mut expr = self;
        while let ExprKind::Group(inner) = &expr.kind {
            expr = inner.as_ref();
        }
        match &expr.kind {
            ExprKind::Number { value, .. } => value.chars().all(|c| c == '0' || c == '.'),
            _ => false,
        }
    }

    /// Whether the last symbol written for this node is a digit, so that a
    /// numeral written right after it would continue the same digit run.
    /// Scripts end with a terminator and brackets with a closer, so neither
    /// counts.
    pub fn ends_with_numeral(&self) -> bool {
        let mut expr = self;
        loop {
            expr = match &expr.kind {
                ExprKind::Number { .. } => return true,
                ExprKind::BinaryOp { right, .. } | ExprKind::Juxtaposition(_, right) => {
                    right.as_ref()
                }
                ExprKind::UnaryOp { operand, .. } => operand.as_ref(),
                // A compound argument is closed off by the group closer.
                ExprKind::Function { argument, .. } => match argument.kind {
                    ExprKind::BinaryOp { .. }
                    | ExprKind::UnaryOp { .. }
                    | ExprKind::Juxtaposition(..) => return false,
                    _ => argument.as_ref(),
                },
                _ => return false,
            };
        }
    }

    /// Whether the first symbol written for this node is an unsigned
    /// numeral's first digit.
    pub fn starts_with_numeral(&self) -> bool {
        let mut expr = self;
        loop {
            expr = match &expr.kind {
                ExprKind::Number { negative, .. } => return !negative,
                ExprKind::BinaryOp { left, .. }
                | ExprKind::Juxtaposition(left, _)
                | ExprKind::Power { base: left, .. }
                | ExprKind::Subscript { base: left, .. } => left.as_ref(),
                _ => return false,
            };
        }
    }

    /// Renders the tree one node per line, children indented under their parent.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut out, 0, None);
        out
    }

    fn write_tree(&self, out: &mut String, indent: usize, label: Option<&str>) -> fmt::Result {
        ensure_sufficient_stack(|| self.write_tree_inner(out, indent, label))
    }

    fn write_tree_inner(&self, out: &mut String, indent: usize, label: Option<&str>) -> fmt::Result {
        write!(out, "{:width$}", "", width = 2 * indent)?;
        if let Some(label) = label {
            write!(out, "[{label}] ")?;
        }

        match &self.kind {
            ExprKind::Number { value, negative } => {
                let sign = if *negative { "-" } else { "" };
                writeln!(out, "Number({sign}{value})")
            }
            ExprKind::Variable(c) => writeln!(out, "Variable({c})"),
            ExprKind::BinaryOp {
                op,
                left,
                right,
                implicit,
            } => {
                let implicit = if *implicit { ", implicit" } else { "" };
                writeln!(out, "BinaryOp({}{implicit})", op.symbol())?;
                left.write_tree(out, indent + 1, Some("L"))?;
                right.write_tree(out, indent + 1, Some("R"))
            }
            ExprKind::UnaryOp { op, operand } => {
                writeln!(out, "UnaryOp({})", op.symbol())?;
                operand.write_tree(out, indent + 1, None)
            }
            ExprKind::Juxtaposition(left, right) => {
                writeln!(out, "Juxtaposition")?;
                left.write_tree(out, indent + 1, Some("L"))?;
                right.write_tree(out, indent + 1, Some("R"))
            }
            ExprKind::Fraction {
                numerator,
                denominator,
                depth,
            } => {
                writeln!(out, "Fraction(depth {depth})")?;
                numerator.write_tree(out, indent + 1, Some("num"))?;
                denominator.write_tree(out, indent + 1, Some("den"))
            }
            ExprKind::Power {
                base,
                exponent,
                depth,
            } => {
                writeln!(out, "Power(depth {depth})")?;
                base.write_tree(out, indent + 1, Some("base"))?;
                exponent.write_tree(out, indent + 1, Some("exp"))
            }
            ExprKind::Subscript {
                base,
                subscript,
                depth,
            } => {
                writeln!(out, "Subscript(depth {depth})")?;
                base.write_tree(out, indent + 1, Some("base"))?;
                subscript.write_tree(out, indent + 1, Some("sub"))
            }
            ExprKind::Root {
                index,
                radicand,
                depth,
            } => {
                writeln!(out, "Root(depth {depth})")?;
                if let Some(index) = index {
                    index.write_tree(out, indent + 1, Some("index"))?;
                }
                radicand.write_tree(out, indent + 1, Some("radicand"))
            }
            ExprKind::Function { name, argument } => {
                writeln!(out, "Function({})", name.name())?;
                argument.write_tree(out, indent + 1, Some("arg"))
            }
            ExprKind::Group(inner) => {
                writeln!(out, "Group")?;
                inner.write_tree(out, indent + 1, Some("inner"))
            }
            ExprKind::Empty => writeln!(out, "Empty"),
        }
    }
}

/// Fully parenthesised rendering, so precedence and associativity are visible
/// at a glance. Parenthesised groups from the source show up as `[...]`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| self.fmt_structure(f))
    }
}

impl Expr {
    fn fmt_structure(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number { value, negative } => {
                if *negative {
                    f.write_char('-')?;
                }
                f.write_str(value)
            }
            ExprKind::Variable(c) => f.write_char(*c),
            ExprKind::BinaryOp {
                op: _,
                left,
                right,
                implicit: true,
            } => write!(f, "({left} {right})"),
            ExprKind::BinaryOp {
                op, left, right, ..
            } => write!(f, "({left} {} {right})", op.symbol()),
            ExprKind::UnaryOp { op, operand } => write!(f, "({}{operand})", op.symbol()),
            ExprKind::Juxtaposition(left, right) => write!(f, "({left} {right})"),
            ExprKind::Fraction {
                numerator,
                denominator,
                ..
            } => write!(f, "\\frac{{{numerator}}}{{{denominator}}}"),
            ExprKind::Power { base, exponent, .. } => write!(f, "({base}^{exponent})"),
            ExprKind::Subscript {
                base, subscript, ..
            } => write!(f, "({base}_{subscript})"),
            ExprKind::Root {
                index: Some(index),
                radicand,
                ..
            } => write!(f, "\\sqrt[{index}]{{{radicand}}}"),
            ExprKind::Root {
                index: None,
                radicand,
                ..
            } => write!(f, "\\sqrt{{{radicand}}}"),
            ExprKind::Function { name, argument } => write!(f, "\\{} {argument}", name.name()),
            ExprKind::Group(inner) => write!(f, "[{inner}]"),
            ExprKind::Empty => f.write_str("{}"),
        }
    }
}
