//! Property-based tests for the translation pipeline.

use kobraille::{braille::table, translate, CellTag, Options, TranslationError};
use proptest::prelude::*;

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,3}",
        "[0-9]{1,2}\\.[0-9]{1,2}",
        "[a-z]",
    ]
}

/// Well-formed expressions over every construct the encoder knows.
fn arb_expr() -> impl Strategy<Value = String> {
    arb_leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} - {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} \\times {b}")),
            inner.clone().prop_map(|a| format!("({a})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("\\frac{{{a}}}{{{b}}}")),
            inner.clone().prop_map(|a| format!("\\sqrt{{{a}}}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{{{a}}}^{{{b}}}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{{{a}}}_{{{b}}}")),
            inner.prop_map(|a| format!("\\cos({a})")),
        ]
    })
}

fn arb_unbalanced(expr: String) -> impl Strategy<Value = String> {
    prop_oneof![
        Just(format!("({expr}")),
        Just(format!("{{{expr}")),
        Just(format!("{expr})")),
        Just(format!("{expr}}}")),
        Just(format!("){expr}")),
        Just(format!("\\frac{{{expr}}}{{1")),
    ]
}

fn roomy() -> Options {
    Options::default().with_max_nesting_depth(32)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn translation_is_deterministic(source in arb_expr()) {
        let first = translate(&source, &roomy());
        let second = translate(&source, &roomy());
        prop_assert!(first.is_ok(), "{source}: {first:?}");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unbalanced_grouping_is_a_syntax_error(
        source in arb_expr().prop_flat_map(arb_unbalanced)
    ) {
        let result = translate(&source, &roomy());
        prop_assert!(
            matches!(result, Err(TranslationError::Syntax(_))),
            "{source}: {result:?}"
        );
    }

    #[test]
    fn one_indicator_per_digit_run(
        numbers in prop::collection::vec("[1-9][0-9]{0,15}", 1..8),
        op in prop_oneof![
            Just(" + "),
            Just(" - "),
            Just(" \\times "),
            Just(" \\cdot "),
            Just(" / "),
            Just(" "),
            Just(" a "),
        ],
    ) {
        // Side-by-side numerals are only accepted once strict mode is off.
        let source = numbers.join(op);
        let lenient = Options::default().with_strict_mode(false);
        let cells = translate(&source, &lenient).unwrap().cells;

        let indicators = cells
            .iter()
            .filter(|cell| cell.tag == CellTag::NumberIndicator)
            .count();
        prop_assert_eq!(indicators, numbers.len());

        let digits = cells.iter().filter(|cell| cell.tag == CellTag::Digit).count();
        prop_assert_eq!(digits, numbers.iter().map(String::len).sum::<usize>());
    }

    #[test]
    fn juxtaposed_numerals_never_share_an_indicator(
        numbers in prop::collection::vec("[1-9][0-9]{0,5}", 2..6),
        prefix in prop_oneof![Just(""), Just("a "), Just("x^2 ")],
        script in prop_oneof![Just(""), Just("^2"), Just("_1")],
    ) {
        let terms: Vec<_> = numbers.iter().map(|number| format!("{number}{script}")).collect();
        let source = format!("{prefix}{}", terms.join(" "));

        let strict = translate(&source, &Options::default());
        prop_assert_eq!(
            matches!(strict, Err(TranslationError::Semantic(_))),
            script.is_empty(),
            "{}: {:?}", source, strict
        );

        let lenient = Options::default().with_strict_mode(false);
        let cells = translate(&source, &lenient).unwrap().cells;
        let indicators = cells
            .iter()
            .filter(|cell| cell.tag == CellTag::NumberIndicator)
            .count();
        let per_term = if script.is_empty() { 1 } else { 2 };
        let in_prefix = usize::from(prefix.contains('^'));
        prop_assert_eq!(indicators, numbers.len() * per_term + in_prefix);
    }

    #[test]
    fn fraction_openers_change_shape_every_two_levels(depth in 1usize..=6) {
        let nested = |depth: usize| {
            let source = format!("{}1{}", r"\frac{".repeat(depth), "}{2}".repeat(depth));
            let cells = translate(&source, &Options::default()).unwrap().cells;
            cells
                .into_iter()
                .filter(|cell| cell.tag == CellTag::FractionOpen(depth))
                .map(|cell| cell.dots)
                .collect::<Vec<_>>()
        };

        let shallow = nested(depth);
        let middle = nested(depth + 1);
        let deep = nested(depth + 2);
        prop_assert!(!shallow.is_empty());
        prop_assert_ne!(&shallow, &deep);
        prop_assert_ne!(middle.last(), shallow.last());
        prop_assert!(
            shallow.last() == Some(&table::FRACTION_OPEN_ODD)
                || shallow.last() == Some(&table::FRACTION_OPEN_EVEN)
        );
    }
}
