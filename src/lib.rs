//! Transcribes LaTeX math into Korean mathematical braille (KS X 1107).
//!
//! [`translate`] runs the whole pipeline: the source is tokenized, parsed into
//! an [`Expr`] tree, normalized and finally encoded into [`BrailleCell`]s.
//! Each stage is also available on its own under [`equation`] and
//! [`braille`].

use thiserror::Error;
use tracing::debug;

use crate::{
    braille::encoder::{Encoder, EncodingError},
    equation::{
        normalize::{normalize, SemanticError, Warning},
        parser::{parse, SyntaxError},
        scanner::{tokenize, LexError},
    },
};

pub mod braille;
pub mod equation;
pub mod options;
mod stack;

pub use crate::{
    braille::{Braille, BrailleCell, CellTag, DotNumbers, Dots},
    equation::{Expr, ExprKind, Span},
    options::{Constructs, Options},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("lexical error: {0}")]
    Lex(#[from] LexError),
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl TranslationError {
    /// Byte offset into the source that the error points at.
    pub fn position(&self) -> usize {
        match self {
            TranslationError::Lex(error) => error.position(),
            TranslationError::Syntax(error) => error.position(),
            TranslationError::Semantic(error) => error.span().start,
            TranslationError::Encoding(error) => error.span().start,
        }
    }
}

/// Braille output together with the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub cells: Vec<BrailleCell>,
    pub warnings: Vec<Warning>,
}

impl Translation {
    pub fn to_unicode(&self) -> String {
        Braille(&self.cells).to_string()
    }
}

/// Translates one LaTeX math expression into braille cells.
///
/// Surrounding `$` delimiters and LaTeX spacing commands are ignored. The
/// first failing stage determines the error; nothing is returned partially.
pub fn translate(source: &str, options: &Options) -> Result<Translation, TranslationError> {
    let tokens = tokenize(source)?;
    debug!(tokens = tokens.len(), "tokenized");

    let expr = parse(&tokens)?;
    debug!(%expr, "parsed");

    let normalized = normalize(expr, options)?;
    debug!(
        expr = %normalized.expr,
        warnings = normalized.warnings.len(),
        "normalized"
    );

    let cells = Encoder::new(options.constructs).encode(&normalized.expr)?;
    debug!(cells = cells.len(), "encoded");

    Ok(Translation {
        cells,
        warnings: normalized.warnings,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn unicode(source: &str) -> String {
        translate(source, &Options::default()).unwrap().to_unicode()
    }

    #[test]
    fn test_translate() {
        assert_eq!(unicode("1+2"), "⠼⠁⠢⠼⠃");
        assert_eq!(unicode(r"$\frac{1}{2}$"), "⠷⠼⠁⠌⠼⠃⠾");
        assert_eq!(unicode(r"x^2 \, + \; 1"), unicode("x^2+1"));
    }

    #[test]
    fn test_error_stages() {
        let options = Options::default();
        assert!(matches!(
            translate("1 # 2", &options),
            Err(TranslationError::Lex(_))
        ));
        assert!(matches!(
            translate("(1+2", &options),
            Err(TranslationError::Syntax(_))
        ));
        assert!(matches!(
            translate(r"\frac{}{2}", &options),
            Err(TranslationError::Semantic(_))
        ));
        assert!(matches!(
            translate(
                r"\sin x",
                &options.clone().with_constructs(Constructs::empty())
            ),
            Err(TranslationError::Encoding(_))
        ));
    }

    #[test]
    fn test_error_positions() {
        let options = Options::default();
        assert_eq!(translate("1 # 2", &options).unwrap_err().position(), 2);
        assert_eq!(translate(r"\frac{1}{2", &options).unwrap_err().position(), 8);
        assert_eq!(translate(r"1+\sqrt{}", &options).unwrap_err().position(), 7);
    }

    #[test]
    fn test_error_display() {
        let error = translate("(1+2", &Options::default()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "syntax error: unclosed `(` opened at offset 0: expected `)` at offset 4, found end of input"
        );
    }

    #[test]
    fn test_warnings_are_returned() {
        let translation = translate("1/0", &Options::default()).unwrap();
        assert_eq!(translation.warnings.len(), 1);
        assert_eq!(translation.to_unicode(), "⠼⠁⠌⠌⠼⠚");
    }

    #[test]
    fn test_long_flat_sum() {
        let source = vec!["1"; 200_000].join("+");
        let translation = translate(&source, &Options::default()).unwrap();
        assert_eq!(translation.cells.len(), 200_000 * 2 + 199_999);

        let source = vec!["x"; 200_000].join(" ");
        assert!(translate(&source, &Options::default()).is_ok());

        let source = format!("{}x", "-".repeat(100_000));
        assert!(translate(&source, &Options::default()).is_ok());
    }

    #[test]
    fn test_translation_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Options>();
        assert_send_sync::<Translation>();
        assert_send_sync::<TranslationError>();
    }
}
