use serde::Serialize;
use std::fmt;

/// How far an instruction can proceed over its input in a single forward pass.
///
/// Variants are ordered from strongest to weakest, so combining two
/// capabilities is simply their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Streamability {
    /// Executes in one forward pass without buffering.
    Full,
    /// Buffers its own subtree of output before deciding what to emit.
    Grounded,
    /// Needs limited lookahead over the input.
    Partial,
    /// Needs random access to the input document.
    None,
}

impl Streamability {
    /// The weaker of two capabilities.
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }

    /// Combines any number of capabilities; an empty input is `Full`.
    pub fn weakest<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Streamability>,
    {
        items.into_iter().fold(Self::Full, Self::combine)
    }

    /// Weakens a capability to at least `Grounded`.
    pub fn grounded(self) -> Self {
        self.combine(Self::Grounded)
    }

    pub fn is_streamable(self) -> bool {
        self <= Self::Grounded
    }
}

impl fmt::Display for Streamability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Full => "full",
            Self::Grounded => "grounded",
            Self::Partial => "partial",
            Self::None => "none",
        };
        f.write_str(name)
    }
}
