use std::fmt;

use bitflags::bitflags;
use itertools::Itertools;

pub mod encoder;
pub mod table;

/// First code point of the Unicode braille patterns block.
const BRAILLE_BASE: u32 = 0x2800;

bitflags! {
    /// Raised dots of a six-dot cell. Dot n is bit n - 1, the same layout as
    /// the Unicode braille patterns block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Dots: u8 {
        const D1 = 1 << 0;
        const D2 = 1 << 1;
        const D3 = 1 << 2;
        const D4 = 1 << 3;
        const D5 = 1 << 4;
        const D6 = 1 << 5;
    }
}

/// Builds a dot pattern from its dot numbers written as decimal digits, so
/// `dots(3456)` raises dots 3, 4, 5 and 6.
pub const fn dots(numbers: u32) -> Dots {
    let mut bits = 0u8;
    let mut rest = numbers;
    while rest > 0 {
        let dot = rest % 10;
        assert!(dot >= 1 && dot <= 6, "braille dots are numbered 1 to 6");
        bits |= 1 << (dot - 1);
        rest /= 10;
    }
    Dots::from_bits_truncate(bits)
}

impl Dots {
    /// Raised dot numbers in ascending order.
    pub fn numbers(self) -> impl Iterator<Item = u8> {
        (1..=6).filter(move |n| self.bits() & (1 << (n - 1)) != 0)
    }

    /// Whether the pattern uses only the upper four dots, the shapes digits
    /// are written with, and so could be read as continuing a numeral.
    pub fn is_digit_shaped(self) -> bool {
        let upper = Dots::D1 | Dots::D2 | Dots::D4 | Dots::D5;
        !self.is_empty() && upper.contains(self)
    }

    pub fn to_char(self) -> char {
        char::from_u32(BRAILLE_BASE + u32::from(self.bits())).unwrap_or('\u{2800}')
    }
}

impl fmt::Display for Dots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", self.numbers().join(""))
        }
    }
}

/// What a cell stands for. Several roles share dot patterns, so the tag is
/// what tells an opening indicator from a letter with the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellTag {
    NumberIndicator,
    Digit,
    DecimalPoint,
    LetterIndicator,
    CapitalIndicator,
    Letter,
    Operator,
    NegativeSign,
    ParenOpen,
    ParenClose,
    /// Any cell of a fraction opener at the given fraction depth.
    FractionOpen(usize),
    FractionLine,
    /// Any cell of a fraction closer at the given fraction depth.
    FractionClose(usize),
    RootIndex,
    RootOpen,
    RootClose,
    PowerIndicator,
    SubscriptIndicator,
    ScriptEnd,
    FunctionName,
    GroupOpen,
    GroupClose,
    Space,
}

impl CellTag {
    /// Whether the cell is an indicator rather than a symbol of the expression.
    pub fn is_indicator(self) -> bool {
        !matches!(
            self,
            CellTag::Digit
                | CellTag::DecimalPoint
                | CellTag::Letter
                | CellTag::Operator
                | CellTag::NegativeSign
                | CellTag::FunctionName
                | CellTag::Space
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrailleCell {
    pub dots: Dots,
    pub tag: CellTag,
}

impl BrailleCell {
    pub const fn new(dots: Dots, tag: CellTag) -> Self {
        BrailleCell { dots, tag }
    }

    pub fn to_char(self) -> char {
        self.dots.to_char()
    }
}

impl fmt::Display for BrailleCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Renders cells as Unicode braille patterns.
pub struct Braille<'a>(pub &'a [BrailleCell]);

impl fmt::Display for Braille<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(cells) = self;
        for cell in cells.iter() {
            write!(f, "{cell}")?;
        }
        Ok(())
    }
}

/// Renders cells as dot numbers separated by spaces, e.g. `3456 1 26`.
pub struct DotNumbers<'a>(pub &'a [BrailleCell]);

impl fmt::Display for DotNumbers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(cells) = self;
        write!(f, "{}", cells.iter().map(|cell| cell.dots).join(" "))
    }
}
