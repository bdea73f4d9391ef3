use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

bitflags! {
    /// Constructs the encoder has braille rules for. Clearing a flag makes the
    /// encoder refuse that construct with
    /// [`EncodingError::UnsupportedConstruct`](crate::braille::encoder::EncodingError),
    /// which is how a partial rollout stays honest about what it covers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Constructs: u8 {
        const FRACTION = 1 << 0;
        const ROOT = 1 << 1;
        const POWER = 1 << 2;
        const SUBSCRIPT = 1 << 3;
        const FUNCTION = 1 << 4;
    }
}

impl Default for Constructs {
    fn default() -> Self {
        Constructs::all()
    }
}

impl fmt::Display for Constructs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Settings for one call to [`translate`](crate::translate).
///
/// Every field has a default, so a partial configuration deserializes into a
/// complete one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Deepest structural nesting (groups, fractions, roots, scripts and
    /// function arguments) accepted before the input is rejected.
    pub max_nesting_depth: usize,
    /// When false, degenerate constructs such as `\frac{}{2}` produce a
    /// warning and best-effort output instead of an error.
    pub strict_mode: bool,
    pub constructs: Constructs,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            strict_mode: true,
            constructs: Constructs::all(),
        }
    }
}

impl Options {
    pub fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    pub fn with_constructs(mut self, constructs: Constructs) -> Self {
        self.constructs = constructs;
        self
    }
}
