//! Cell assignments for the KS X 1107 subset the encoder covers.

use crate::equation::{BinaryOperator, Function, UnaryOperator};

use super::{dots, Dots};

pub const NUMBER_INDICATOR: Dots = dots(3456);
pub const DECIMAL_POINT: Dots = dots(256);
pub const NEGATIVE_SIGN: Dots = dots(36);

pub const LETTER_INDICATOR: Dots = dots(56);
pub const CAPITAL_INDICATOR: Dots = dots(6);

pub const PAREN_OPEN: Dots = dots(236);
pub const PAREN_CLOSE: Dots = dots(356);

pub const FRACTION_OPEN_ODD: Dots = dots(12356);
pub const FRACTION_OPEN_EVEN: Dots = dots(12346);
pub const FRACTION_CLOSE_ODD: Dots = dots(23456);
pub const FRACTION_CLOSE_EVEN: Dots = dots(123456);
pub const FRACTION_NESTING_PREFIX: Dots = dots(456);
pub const FRACTION_LINE: Dots = dots(34);

pub const ROOT_INDEX: Dots = dots(346);
pub const ROOT_OPEN: Dots = dots(345);
pub const ROOT_CLOSE: Dots = dots(12456);

pub const POWER_INDICATOR: Dots = dots(45);
pub const SUBSCRIPT_INDICATOR: Dots = dots(126);
pub const SCRIPT_END: Dots = dots(156);

pub const FUNCTION_INDICATOR: Dots = dots(1246);
pub const GROUP_OPEN: [Dots; 2] = [dots(5), dots(236)];
pub const GROUP_CLOSE: [Dots; 2] = [dots(356), dots(2)];

pub const SPACE: Dots = Dots::empty();

const DIGITS: [Dots; 10] = [
    dots(245),  // 0
    dots(1),    // 1
    dots(12),   // 2
    dots(14),   // 3
    dots(145),  // 4
    dots(15),   // 5
    dots(124),  // 6
    dots(1245), // 7
    dots(125),  // 8
    dots(24),   // 9
];

const LETTERS: [Dots; 26] = [
    dots(1),      // a
    dots(12),     // b
    dots(14),     // c
    dots(145),    // d
    dots(15),     // e
    dots(124),    // f
    dots(1245),   // g
    dots(125),    // h
    dots(24),     // i
    dots(245),    // j
    dots(13),     // k
    dots(123),    // l
    dots(134),    // m
    dots(1345),   // n
    dots(135),    // o
    dots(1234),   // p
    dots(12345),  // q
    dots(1235),   // r
    dots(234),    // s
    dots(2345),   // t
    dots(136),    // u
    dots(1236),   // v
    dots(2456),   // w
    dots(1346),   // x
    dots(13456),  // y
    dots(1356),   // z
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorRule {
    pub cells: &'static [Dots],
    /// Written with a blank cell on each side.
    pub spaced: bool,
}

const PLUS: &[Dots] = &[dots(26)];
const MINUS: &[Dots] = &[dots(35)];
const TIMES: &[Dots] = &[dots(16)];
const CDOT: &[Dots] = &[dots(5), dots(2)];
const DIVIDE: &[Dots] = &[dots(34), dots(34)];
const EQUALS: &[Dots] = &[dots(25), dots(25)];

pub fn digit(c: char) -> Option<Dots> {
    let index = c.to_digit(10)?;
    DIGITS.get(index as usize).copied()
}

/// The cell of a Latin letter, ignoring case.
pub fn letter(c: char) -> Option<Dots> {
    if !c.is_ascii_alphabetic() {
        return None;
    }
    let index = c.to_ascii_lowercase() as usize - 'a' as usize;
    LETTERS.get(index).copied()
}

pub fn binary_operator(op: BinaryOperator) -> OperatorRule {
    let (cells, spaced) = match op {
        BinaryOperator::Add => (PLUS, false),
        BinaryOperator::Subtract => (MINUS, false),
        BinaryOperator::Multiply => (TIMES, false),
        BinaryOperator::Dot => (CDOT, false),
        BinaryOperator::Divide => (DIVIDE, false),
        BinaryOperator::Equals => (EQUALS, true),
    };
    OperatorRule { cells, spaced }
}

/// A sign in front of anything but a numeral is written like the binary
/// operator. Negative numerals use [`NEGATIVE_SIGN`] instead.
pub fn unary_operator(op: UnaryOperator) -> OperatorRule {
    match op {
        UnaryOperator::Plus => binary_operator(BinaryOperator::Add),
        UnaryOperator::Minus => binary_operator(BinaryOperator::Subtract),
    }
}

/// Abbreviation spelled after [`FUNCTION_INDICATOR`].
pub fn function_abbreviation(function: Function) -> &'static str {
    function.name()
}

/// Cells opening a fraction at `depth` (outermost is 1). Odd and even depths
/// alternate between two shapes; every further pair of levels adds one
/// nesting prefix, so no two depths share an opener.
pub fn fraction_open(depth: usize) -> impl Iterator<Item = Dots> {
    let shape = if depth % 2 == 1 {
        FRACTION_OPEN_ODD
    } else {
        FRACTION_OPEN_EVEN
    };
    nesting_prefixes(depth).chain(std::iter::once(shape))
}

pub fn fraction_close(depth: usize) -> impl Iterator<Item = Dots> {
    let shape = if depth % 2 == 1 {
        FRACTION_CLOSE_ODD
    } else {
        FRACTION_CLOSE_EVEN
    };
    nesting_prefixes(depth).chain(std::iter::once(shape))
}

fn nesting_prefixes(depth: usize) -> impl Iterator<Item = Dots> {
    std::iter::repeat(FRACTION_NESTING_PREFIX).take(depth.saturating_sub(1) / 2)
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_digits() {
        let rendered: String = ('0'..='9')
            .map(|c| digit(c).unwrap().to_char())
            .collect();
        assert_eq!(rendered, "⠚⠁⠃⠉⠙⠑⠋⠛⠓⠊");
        assert_eq!(digit('x'), None);
    }

    #[test]
    fn test_letters() {
        assert_eq!(letter('a'), Some(dots(1)));
        assert_eq!(letter('X'), Some(dots(1346)));
        assert_eq!(letter('z'), Some(dots(1356)));
        assert_eq!(letter('1'), None);
        assert_eq!(letter('é'), None);
    }

    #[test]
    fn test_operators() {
        let rendered: Vec<String> = [
            BinaryOperator::Add,
            BinaryOperator::Subtract,
            BinaryOperator::Multiply,
            BinaryOperator::Divide,
        ]
        .into_iter()
        .map(|op| {
            binary_operator(op)
                .cells
                .iter()
                .map(|cell| cell.to_char())
                .collect()
        })
        .collect();
        assert_eq!(rendered, vec!["⠢", "⠔", "⠡", "⠌⠌"]);
        assert!(binary_operator(BinaryOperator::Equals).spaced);
        assert_eq!(
            unary_operator(UnaryOperator::Minus),
            binary_operator(BinaryOperator::Subtract)
        );
    }

    #[test]
    fn test_fraction_openers_differ_by_depth() {
        let openers: Vec<Vec<Dots>> = (1..=8).map(|d| fraction_open(d).collect()).collect();
        assert_eq!(openers[0], vec![FRACTION_OPEN_ODD]);
        assert_eq!(openers[1], vec![FRACTION_OPEN_EVEN]);
        assert_eq!(
            openers[2],
            vec![FRACTION_NESTING_PREFIX, FRACTION_OPEN_ODD]
        );
        assert!(openers.iter().all_unique());

        for (a, b) in openers.iter().tuple_windows() {
            assert_ne!(a.last(), b.last(), "adjacent depths alternate shape");
        }
    }

    #[test]
    fn test_fraction_closers_mirror_openers() {
        for depth in 1..=6 {
            assert_eq!(fraction_open(depth).count(), fraction_close(depth).count());
        }
        assert_eq!(fraction_close(2).collect::<Vec<_>>(), vec![FRACTION_CLOSE_EVEN]);
    }
}
