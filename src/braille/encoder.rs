use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::{
    equation::{Expr, ExprKind, Span},
    options::{Constructs, Options},
    stack::ensure_sufficient_stack,
};

use super::{
    table::{self, OperatorRule},
    BrailleCell, CellTag, Dots,
};

/// A node kind the encoder may have no rule for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    Fraction,
    Root,
    Power,
    Subscript,
    Function,
    /// Operands side by side that were never normalized into a product.
    Juxtaposition,
}

impl Construct {
    fn flag(self) -> Option<Constructs> {
        match self {
            Construct::Fraction => Some(Constructs::FRACTION),
            Construct::Root => Some(Constructs::ROOT),
            Construct::Power => Some(Constructs::POWER),
            Construct::Subscript => Some(Constructs::SUBSCRIPT),
            Construct::Function => Some(Constructs::FUNCTION),
            Construct::Juxtaposition => None,
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Construct::Fraction => "fraction",
            Construct::Root => "root",
            Construct::Power => "superscript",
            Construct::Subscript => "subscript",
            Construct::Function => "function",
            Construct::Juxtaposition => "unnormalized juxtaposition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("no braille rule for {construct} at {span}")]
    UnsupportedConstruct { construct: Construct, span: Span },
}

impl EncodingError {
    pub fn span(&self) -> Span {
        match self {
            EncodingError::UnsupportedConstruct { span, .. } => *span,
        }
    }
}

/// Encodes a normalized expression with the constructs `options` enables.
pub fn encode(expr: &Expr, options: &Options) -> Result<Vec<BrailleCell>, EncodingError> {
    Encoder::new(options.constructs).encode(expr)
}

/// Turns normalized expression trees into braille cells.
///
/// The encoder itself holds only the rule selection; each call to
/// [`Encoder::encode`] works on its own encoding context, so one encoder
/// can serve any number of calls.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    constructs: Constructs,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(Constructs::all())
    }
}

impl Encoder {
    pub fn new(constructs: Constructs) -> Self {
        Encoder { constructs }
    }

    pub fn encode(&self, expr: &Expr) -> Result<Vec<BrailleCell>, EncodingError> {
        let mut context = EncodingContext::default();
        self.node(&mut context, expr)?;
        let cells = context.finish();
        trace!(cells = cells.len(), "encoded");
        Ok(cells)
    }

    fn require(&self, construct: Construct, span: Span) -> Result<(), EncodingError> {
        match construct.flag() {
            Some(flag) if self.constructs.contains(flag) => Ok(()),
            _ => Err(EncodingError::UnsupportedConstruct { construct, span }),
        }
    }

    fn node(&self, cx: &mut EncodingContext, expr: &Expr) -> Result<(), EncodingError> {
        ensure_sufficient_stack(|| self.node_inner(cx, expr))
    }

    fn node_inner(&self, cx: &mut EncodingContext, expr: &Expr) -> Result<(), EncodingError> {
        match &expr.kind {
            ExprKind::Number { value, negative } => cx.number(value, *negative),
            ExprKind::Variable(c) => cx.letter(*c),
            ExprKind::BinaryOp {
                op,
                left,
                right,
                implicit,
            } => {
                self.node(cx, left)?;
                if !implicit {
                    cx.operator(table::binary_operator(*op));
                }
                self.node(cx, right)?;
            }
            ExprKind::UnaryOp { op, operand } => {
                cx.operator(table::unary_operator(*op));
                self.node(cx, operand)?;
            }
            ExprKind::Juxtaposition(..) => {
                self.require(Construct::Juxtaposition, expr.span)?;
            }
            ExprKind::Fraction {
                numerator,
                denominator,
                depth,
            } => {
                self.require(Construct::Fraction, expr.span)?;
                let depth = cx.enter(Scope::Fraction, *depth);
                for dots in table::fraction_open(depth) {
                    cx.emit(dots, CellTag::FractionOpen(depth), Category::Indicator);
                }
                self.node(cx, numerator)?;
                cx.close(table::FRACTION_LINE, CellTag::FractionLine);
                self.node(cx, denominator)?;
                for dots in table::fraction_close(depth) {
                    cx.close(dots, CellTag::FractionClose(depth));
                }
                cx.scopes.pop();
            }
            ExprKind::Root {
                index,
                radicand,
                depth,
            } => {
                self.require(Construct::Root, expr.span)?;
                cx.enter(Scope::Root, *depth);
                if let Some(index) = index {
                    cx.emit(table::ROOT_INDEX, CellTag::RootIndex, Category::Indicator);
                    self.node(cx, index)?;
                    cx.close(table::ROOT_OPEN, CellTag::RootOpen);
                } else {
                    cx.emit(table::ROOT_OPEN, CellTag::RootOpen, Category::Indicator);
                }
                self.node(cx, radicand)?;
                cx.close(table::ROOT_CLOSE, CellTag::RootClose);
                cx.scopes.pop();
            }
            ExprKind::Power {
                base,
                exponent,
                depth,
            } => {
                self.require(Construct::Power, expr.span)?;
                self.script(
                    cx,
                    base,
                    table::POWER_INDICATOR,
                    CellTag::PowerIndicator,
                    exponent,
                    *depth,
                )?;
            }
            ExprKind::Subscript {
                base,
                subscript,
                depth,
            } => {
                self.require(Construct::Subscript, expr.span)?;
                self.script(
                    cx,
                    base,
                    table::SUBSCRIPT_INDICATOR,
                    CellTag::SubscriptIndicator,
                    subscript,
                    *depth,
                )?;
            }
            ExprKind::Function { name, argument } => {
                self.require(Construct::Function, expr.span)?;
                cx.emit(
                    table::FUNCTION_INDICATOR,
                    CellTag::FunctionName,
                    Category::Indicator,
                );
                for c in table::function_abbreviation(*name).chars() {
                    if let Some(dots) = table::letter(c) {
                        cx.emit(dots, CellTag::FunctionName, Category::Indicator);
                    }
                }

                if is_compound(argument) {
                    cx.scopes.push(Scope::Group);
                    for dots in table::GROUP_OPEN {
                        cx.emit(dots, CellTag::GroupOpen, Category::Indicator);
                    }
                    self.node(cx, argument)?;
                    for dots in table::GROUP_CLOSE {
                        cx.close(dots, CellTag::GroupClose);
                    }
                    cx.scopes.pop();
                } else {
                    self.node(cx, argument)?;
                }
            }
            ExprKind::Group(inner) => {
                cx.scopes.push(Scope::Group);
                cx.emit(table::PAREN_OPEN, CellTag::ParenOpen, Category::Indicator);
                self.node(cx, inner)?;
                cx.close(table::PAREN_CLOSE, CellTag::ParenClose);
                cx.scopes.pop();
            }
            // Only reachable outside strict mode, where the gap is already
            // reported as a warning.
            ExprKind::Empty => {}
        }
        Ok(())
    }

    fn script(
        &self,
        cx: &mut EncodingContext,
        base: &Expr,
        indicator: Dots,
        tag: CellTag,
        script: &Expr,
        depth: usize,
    ) -> Result<(), EncodingError> {
        self.node(cx, base)?;
        cx.emit(indicator, tag, Category::Indicator);
        cx.enter(Scope::Script, depth);
        self.node(cx, script)?;
        cx.scopes.pop();
        cx.pending_script_ends += 1;
        Ok(())
    }
}

/// Whether a function argument needs explicit grouping to show where it ends.
fn is_compound(argument: &Expr) -> bool {
    match &argument.kind {
        ExprKind::Number { .. }
        | ExprKind::Variable(_)
        | ExprKind::Group(_)
        | ExprKind::Fraction { .. }
        | ExprKind::Root { .. }
        | ExprKind::Empty => false,
        ExprKind::Power { base, exponent, .. } => is_compound(base) || is_compound(exponent),
        ExprKind::Subscript {
            base, subscript, ..
        } => is_compound(base) || is_compound(subscript),
        ExprKind::Function { argument, .. } => is_compound(argument),
        ExprKind::BinaryOp { .. } | ExprKind::UnaryOp { .. } | ExprKind::Juxtaposition(..) => {
            true
        }
    }
}

/// Kind of the last cell written, which decides whether the next symbol needs
/// a mode indicator or a separating space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Start,
    Number,
    Letter,
    Operator,
    Indicator,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Fraction,
    Root,
    Script,
    Group,
}

/// State of one encoding pass.
///
/// Depths come from `scopes`, so the encoder also handles trees that never
/// went through the normalizer. The `depth` annotations the normalizer adds
/// must agree wherever they are set.
#[derive(Debug)]
struct EncodingContext {
    cells: Vec<BrailleCell>,
    scopes: Vec<Scope>,
    last: Category,
    /// Scripts that ended without a terminator yet. One terminator is written
    /// per level before the next baseline symbol; a closing indicator ends
    /// them implicitly.
    pending_script_ends: usize,
}

impl Default for EncodingContext {
    fn default() -> Self {
        EncodingContext {
            cells: Vec::new(),
            scopes: Vec::new(),
            last: Category::Start,
            pending_script_ends: 0,
        }
    }
}

impl EncodingContext {
    /// Number of open scopes of `kind`, counting the innermost.
    fn depth(&self, kind: Scope) -> usize {
        self.scopes.iter().filter(|&&scope| scope == kind).count()
    }

    /// Opens a scope and returns its depth. `annotated` is the node's own
    /// depth field, 0 when unset.
    fn enter(&mut self, scope: Scope, annotated: usize) -> usize {
        self.scopes.push(scope);
        let depth = self.depth(scope);
        debug_assert!(
            annotated == 0 || annotated == depth,
            "{scope:?} annotated at depth {annotated}, encoded at {depth}"
        );
        depth
    }

    fn push(&mut self, dots: Dots, tag: CellTag, category: Category) {
        self.cells.push(BrailleCell::new(dots, tag));
        self.last = category;
    }

    /// Writes the terminators of scripts that ended before this point.
    fn settle(&mut self) {
        for _ in 0..self.pending_script_ends {
            self.push(table::SCRIPT_END, CellTag::ScriptEnd, Category::Indicator);
        }
        self.pending_script_ends = 0;
    }

    /// Writes a symbol or opening indicator.
    fn emit(&mut self, dots: Dots, tag: CellTag, category: Category) {
        self.settle();
        self.push(dots, tag, category);
    }

    /// Writes a closing indicator, which also ends any open script.
    fn close(&mut self, dots: Dots, tag: CellTag) {
        self.pending_script_ends = 0;
        self.push(dots, tag, Category::Indicator);
    }

    fn space(&mut self) {
        self.emit(table::SPACE, CellTag::Space, Category::Space);
    }

    fn number(&mut self, value: &str, negative: bool) {
        self.settle();
        if negative {
            self.emit(table::NEGATIVE_SIGN, CellTag::NegativeSign, Category::Operator);
        }
        if self.last != Category::Number {
            self.emit(
                table::NUMBER_INDICATOR,
                CellTag::NumberIndicator,
                Category::Indicator,
            );
        }
        for c in value.chars() {
            if c == '.' {
                self.emit(table::DECIMAL_POINT, CellTag::DecimalPoint, Category::Number);
            } else if let Some(dots) = table::digit(c) {
                self.emit(dots, CellTag::Digit, Category::Number);
            }
        }
    }

    fn letter(&mut self, c: char) {
        let Some(dots) = table::letter(c) else {
            return;
        };
        self.settle();
        if self.last != Category::Letter {
            self.emit(
                table::LETTER_INDICATOR,
                CellTag::LetterIndicator,
                Category::Indicator,
            );
        }
        if c.is_ascii_uppercase() {
            self.emit(
                table::CAPITAL_INDICATOR,
                CellTag::CapitalIndicator,
                Category::Indicator,
            );
        }
        self.emit(dots, CellTag::Letter, Category::Letter);
    }

    fn operator(&mut self, rule: OperatorRule) {
        self.settle();
        let after_number = self.last == Category::Number;
        let needs_separation = rule
            .cells
            .first()
            .is_some_and(|dots| dots.is_digit_shaped());
        if rule.spaced || (after_number && needs_separation) {
            self.space();
        }
        for &dots in rule.cells {
            self.emit(dots, CellTag::Operator, Category::Operator);
        }
        if rule.spaced {
            self.space();
        }
    }

    fn finish(mut self) -> Vec<BrailleCell> {
        self.pending_script_ends = 0;
        self.cells
    }
}
